pub mod aggregator;
pub mod chunk_builder;
pub mod llm_service;
pub mod pacer;
pub mod spreadsheet;
pub mod warn_writer;

pub use aggregator::{NanPolicy, ResultAggregator, CSV_HEADERS};
pub use chunk_builder::ChunkBuilder;
pub use llm_service::{Generator, LlmService};
pub use pacer::{FixedIntervalPacer, NoPacing, Pacer};
pub use spreadsheet::{sheet_to_xlsx, Cell};
pub use warn_writer::WarnWriter;
