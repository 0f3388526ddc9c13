//! JSON rendering of query results.

use anyhow::Result;
use serde::Serialize;
use std::io::Write;

use crate::queries::QueryOutput;

/// One query renders as a single object, several as an array
pub fn render_outputs(outputs: &[QueryOutput], pretty: bool) -> Result<String> {
    match outputs {
        [single] => to_json(single, pretty),
        many => to_json(many, pretty),
    }
}

pub fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

/// Write rendered outputs followed by a newline
pub fn write_outputs(out: &mut impl Write, outputs: &[QueryOutput], pretty: bool) -> Result<()> {
    writeln!(out, "{}", render_outputs(outputs, pretty)?)?;
    Ok(())
}
