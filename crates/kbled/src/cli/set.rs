//! `set` subcommand — switch one indicator on every matching keyboard.

use std::io::{self, Write};

use super::{
    HidHost, Indicator, IndicatorRequest, LedState, Result, RunOptions, RunOutcome, hid,
    report_outcome,
};

/// Apply one indicator change through `host`, writing verbose lines to `out`.
fn set_with<H: HidHost>(
    host: &H,
    indicator: Indicator,
    state: LedState,
    options: &RunOptions,
    out: &mut impl Write,
) -> Result<RunOutcome> {
    let request = IndicatorRequest::single(indicator, state);
    kbled_lib::set_all_keyboards(host, &request, options, out)
}

pub(super) fn cmd_set(indicator: Indicator, state: LedState, options: &RunOptions) -> Result<()> {
    let host = hid::platform_host();
    let outcome = set_with(&host, indicator, state, options, &mut io::stdout().lock())?;
    report_outcome(&outcome);
    Ok(())
}
