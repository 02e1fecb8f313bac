//! `status` subcommand — print indicator state of every matching keyboard.

use std::io::{self, Write};

use super::{
    DeviceReport, HidHost, IndicatorRequest, Result, RunOptions, RunOutcome, StatusOutput, hid,
    report_outcome,
};

/// Read-only pass. Lines go to `out` unless `json`, in which case only the
/// outcome is returned.
fn collect_status<H: HidHost>(
    host: &H,
    options: &RunOptions,
    json: bool,
    out: &mut impl Write,
) -> Result<RunOutcome> {
    let options = RunOptions {
        verbose: !json,
        ..options.clone()
    };
    kbled_lib::set_all_keyboards(host, &IndicatorRequest::none(), &options, out)
}

fn status_json(reports: &[DeviceReport]) -> Result<String> {
    let output = StatusOutput {
        count: reports.len(),
        keyboards: reports.to_vec(),
    };
    serde_json::to_string_pretty(&output).map_err(|e| {
        kbled_lib::KbledError::Config(format!("JSON serialization failed: {e}"))
    })
}

pub(super) fn cmd_status(options: &RunOptions, json: bool) -> Result<()> {
    let host = hid::platform_host();
    let outcome = collect_status(&host, options, json, &mut io::stdout().lock())?;
    if json {
        println!("{}", status_json(outcome.reports())?);
    }
    report_outcome(&outcome);
    Ok(())
}
