//! `snmpflow classify`: one-shot sysObjectID lookup.

use snmpflow_core::Classification;

use crate::cli::{ClassifyArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{load_config, open_mib};

pub fn handle(args: &ClassifyArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let db = if args.db.is_some() {
        // Skip the config file entirely when the database is given.
        open_mib(args.db.as_deref(), &snmpflow_config::Config::default(), global)?
    } else {
        let config = load_config(global)?;
        open_mib(None, &config, global)?
    };

    let result = db.classify(&args.oid, &args.template, &args.description);
    db.close()?;
    let classification = result?;

    let out = output::render_single(global.output, &classification, detail, |c| {
        c.provider.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(c: &Classification) -> String {
    output::detail_table(&[
        ("Provider", c.provider.to_string()),
        ("Template", c.template.clone().unwrap_or_else(|| "-".into())),
        ("Description", c.description.clone().unwrap_or_else(|| "-".into())),
        (
            "Matched",
            c.matched.as_ref().map_or_else(|| "-".into(), ToString::to_string),
        ),
        ("Found", c.found.to_string()),
    ])
}
