use std::time::Duration;

use anyhow::Result;

use dstore_cli::pipeline::{
    ImportOutcome, ImportRequest, OptionOverrides, drop_import, import, preview_schema,
    resolve_options, resource_for, status,
};
use dstore_core::JobState;
use dstore_model::Schema;

use crate::cli::{ImportArgs, JobArgs, SchemaArgs};

pub fn run_import(args: &ImportArgs) -> Result<ImportOutcome> {
    let overrides = OptionOverrides {
        chunk_size: args.options.chunk_size,
        time_budget: args.options.time_budget_ms.map(Duration::from_millis),
        max_passes: args.options.max_passes,
    };
    let options = resolve_options(args.options.config.as_deref(), &overrides)?;
    let resource = resource_for(&args.file, args.id.as_deref(), args.mime_type.as_deref());
    import(ImportRequest {
        resource,
        storage: args.storage.into(),
        state_path: args.job.state.clone(),
        storage_dir: args.job.storage_dir.clone(),
        options,
        retry: args.retry,
    })
}

pub fn run_status(args: &JobArgs) -> Result<Option<JobState>> {
    status(&args.state)
}

pub fn run_drop(args: &JobArgs) -> Result<Option<usize>> {
    drop_import(&args.state, &args.storage_dir)
}

pub fn run_schema(args: &SchemaArgs) -> Result<Schema> {
    let resource = resource_for(&args.file, None, args.mime_type.as_deref());
    preview_schema(&resource)
}
