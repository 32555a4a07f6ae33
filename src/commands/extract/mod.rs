use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::cli::{ExtractArgs, FormatHint};
use crate::model::{
    AcquiredSource, Document, ExtractionRunManifest, Page, RawTable, StrategyRecord,
    VariableSummary,
};
use crate::profile::{
    ExtractionProfile, ExtractorKind, VariableProfile, collapse_whitespace, contains_any,
    load_profile,
};
use crate::util::{
    now_utc_string, read_json, sha256_file, utc_compact_string, write_json_pretty,
};
use crate::variation::{
    DEFAULT_CODE, FieldUpdate, LevelEntry, VariationSet, split_bracketed_code,
    update_field_values,
};

mod acquire;
mod categories;
mod classify;
mod complete;
mod layout_tables;
mod run;
mod specialized;
mod strategy;
mod text_segments;
mod unified_table;
#[cfg(test)]
mod tests;

pub use acquire::{DocumentSource, acquire_document};
pub use run::{parse_field_update, run};
pub use text_segments::ExtractionPatterns;

use categories::*;
use classify::*;
use complete::*;
use layout_tables::*;
use specialized::*;
use strategy::*;
use text_segments::*;
use unified_table::*;
