use super::*;

const RUN_MANIFEST_VERSION: u32 = 1;

pub fn run(args: ExtractArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let report_path = args.report_path.clone().unwrap_or_else(|| {
        args.output
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
            .join(format!("extraction_run_{}.json", utc_compact_string(started_ts)))
    });

    info!(
        run_id = %run_id,
        source = %args.source,
        format = args.format_hint.as_str(),
        "starting extraction"
    );

    let profile = load_profile(args.profile_path.as_deref())?;
    let patterns = ExtractionPatterns::new()?;

    let source = DocumentSource::parse(&args.source);
    let acquired = acquire_document(&source, &patterns)?;

    let extraction = extract_variation_set(
        &acquired.document,
        &profile,
        &patterns,
        FormatProfile::for_hint(args.format_hint),
    );

    let mut warnings = Vec::<String>::new();
    let mut updates = Vec::<FieldUpdate>::new();
    for raw in &args.edits {
        match parse_field_update(raw) {
            Some(update) => updates.push(update),
            None => {
                warn!(edit = %raw, "invalid edit format, expected \"Variable:ID=New Value\"");
                warnings.push(format!("invalid edit format: {raw}"));
            }
        }
    }
    let (set, edit_warnings) = update_field_values(extraction.set, &updates);
    warnings.extend(edit_warnings.iter().map(ToString::to_string));

    write_json_pretty(&args.output, &set)?;

    for name in &set.variables {
        info!(variable = %name, levels = set.level_count(name), "extracted variable");
    }
    info!(
        output = %args.output.display(),
        variables = set.variables.len(),
        combinations = extraction.completion.combination_count,
        "wrote variation set"
    );

    let manifest = ExtractionRunManifest {
        manifest_version: RUN_MANIFEST_VERSION,
        run_id,
        started_at,
        updated_at: now_utc_string(),
        format_hint: args.format_hint.as_str().to_string(),
        output_path: args.output.display().to_string(),
        source: acquired.source,
        strategies: extraction.records,
        variables: extraction.variables,
        injected_variables: extraction.completion.injected_variables,
        injected_defaults: extraction.completion.injected_defaults,
        combination_count: extraction.completion.combination_count,
        warnings,
    };
    write_json_pretty(&report_path, &manifest)?;

    info!(path = %report_path.display(), "wrote extraction run report");
    Ok(())
}

/// Parses `"Variable:ID=New Value"`. The value may itself contain `=` or `:`.
pub fn parse_field_update(raw: &str) -> Option<FieldUpdate> {
    let (field, value) = raw.split_once('=')?;
    let parts = field.split(':').collect::<Vec<&str>>();
    let [variable, data] = parts.as_slice() else {
        return None;
    };

    let (variable, data) = (variable.trim(), data.trim());
    if variable.is_empty() || data.is_empty() {
        return None;
    }

    Some(FieldUpdate {
        variable: variable.to_string(),
        data: data.to_string(),
        value: value.trim().to_string(),
    })
}
