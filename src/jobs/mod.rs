/*!
 * Jobs
 * Loading and generating dispatch lists
 */

pub mod generator;
pub mod loader;

pub use generator::{
    generate_dispatch_list, generate_records, render_dispatch_list, write_dispatch_list,
    GeneratorConfig,
};
pub use loader::{
    load_jobs, parse_jobs, parse_record, JobRecord, LoadError, LoadReport, RecordError,
    SkippedRecord,
};
