pub mod config;
pub mod dates;
pub mod decode;
pub mod error;
pub mod filter;
pub mod locate;
pub mod logging;
pub mod pipeline;
pub mod record;
pub mod sink;
pub mod source;

pub use config::RunConfig;
pub use dates::{DateWindow, DirConvention};
pub use decode::RecordFormat;
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, PipelineParams};
pub use record::{FilterMode, KeyFilterSpec, Record, StructuredRecord};
pub use sink::{run_stream, run_to_sink, RecordStream, TransformFn};
