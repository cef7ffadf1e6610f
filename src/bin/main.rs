// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::Parser;
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use loyalty_engine_rs::{AttributeValue, Attributes, Catalog, CreditRequest, Engine, EngineConfig};
use rust_decimal::Decimal;
use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;
use tracing::Level;

/// Loyalty Engine - Credit points for transaction CSV files
///
/// Resolves each transaction against the promotion catalog, records the
/// credit under a unique reference and writes the credits to stdout.
#[derive(Parser, Debug)]
#[command(name = "loyalty-engine-rs")]
#[command(about = "Resolves loyalty promotions for transaction CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with transactions
    ///
    /// Expected format: member_id,airline_code,partner_code,amount[,attribute...]
    /// Every extra column is passed to eligibility rules as an attribute.
    #[arg(value_name = "FILE", required_unless_present = "names")]
    input: Option<PathBuf>,

    /// Path to the promotion catalog (JSON array)
    #[arg(short, long, value_name = "FILE")]
    promotions: PathBuf,

    /// List the names of a partner's promotions as JSON instead of
    /// processing transactions
    #[arg(long, value_name = "PARTNER")]
    names: Option<String>,

    /// Reference attempts per credit before giving up
    #[arg(long, default_value_t = loyalty_engine_rs::DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Instant promotions are evaluated at (RFC 3339), defaults to now
    #[arg(long)]
    now: Option<DateTime<Utc>>,

    /// Log every resolution decision
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let catalog = load_catalog(&args.promotions)?;
    tracing::info!(promotions = catalog.len(), "catalog loaded");

    let engine = Engine::with_config(
        catalog,
        EngineConfig {
            max_reference_attempts: args.max_attempts,
        },
    );

    if let Some(partner_code) = &args.names {
        return write_promotion_names(&engine, partner_code, std::io::stdout())
            .context("writing promotion names");
    }

    let Some(input) = &args.input else {
        bail!("no transactions file given");
    };
    let file =
        File::open(input).with_context(|| format!("opening transactions '{}'", input.display()))?;
    let now = args.now.unwrap_or_else(Utc::now);
    let credited = process_transactions(&engine, BufReader::new(file), now)?;
    tracing::info!(credited, "transactions processed");

    write_credits(&engine, std::io::stdout()).context("writing credits")?;
    Ok(())
}

fn load_catalog(path: &Path) -> anyhow::Result<Catalog> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading promotions '{}'", path.display()))?;
    Catalog::from_json(&json).with_context(|| format!("parsing promotions '{}'", path.display()))
}

/// Leading columns of every transaction row.
const FIXED_COLUMNS: [&str; 4] = ["member_id", "airline_code", "partner_code", "amount"];

fn required(row: &StringRecord, index: usize) -> anyhow::Result<&str> {
    match row.get(index) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => bail!("missing {}", FIXED_COLUMNS[index]),
    }
}

/// Converts a CSV row to a credit request.
///
/// Columns after the fixed ones become attributes; empty cells are omitted.
fn parse_request(headers: &StringRecord, row: &StringRecord) -> anyhow::Result<CreditRequest> {
    let amount = Decimal::from_str(required(row, 3)?).context("invalid amount")?;

    let attributes: Attributes = headers
        .iter()
        .zip(row.iter())
        .skip(FIXED_COLUMNS.len())
        .filter(|(_, cell)| !cell.is_empty())
        .map(|(name, cell)| (name.to_string(), AttributeValue::from_cell(cell)))
        .collect();

    Ok(CreditRequest {
        member_id: required(row, 0)?.to_string(),
        airline_code: required(row, 1)?.to_string(),
        partner_code: required(row, 2)?.to_string(),
        amount,
        attributes,
    })
}

/// Credits every transaction in a CSV reader.
///
/// Rows that cannot be parsed and transactions the engine rejects are
/// logged and skipped; the remaining rows are still processed.
///
/// # CSV Format
///
/// ```csv
/// member_id,airline_code,partner_code,amount,monthly_spending,black_card_holder
/// 1234567890,GJP,DBS,1000,2000,true
/// ```
///
/// # Errors
///
/// Returns an error if the header row cannot be read or does not start with
/// the fixed columns.
pub fn process_transactions<R: Read>(engine: &Engine, reader: R, now: DateTime<Utc>) -> anyhow::Result<usize> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers = rdr.headers().context("reading header row")?.clone();
    let leading: Vec<&str> = headers.iter().take(FIXED_COLUMNS.len()).collect();
    if leading != FIXED_COLUMNS {
        bail!("header must start with {}", FIXED_COLUMNS.join(","));
    }

    let mut credited = 0;
    for (line, result) in rdr.records().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(line, "skipping malformed row: {e}");
                continue;
            }
        };

        let request = match parse_request(&headers, &row) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(line, "skipping invalid transaction: {e:#}");
                continue;
            }
        };

        match engine.process(&request, now) {
            Ok(_) => credited += 1,
            Err(e) => tracing::warn!(line, member = %request.member_id, "transaction rejected: {e}"),
        }
    }

    Ok(credited)
}

/// Writes credits recorded since the last call, in commit order.
///
/// # CSV Format
///
/// Columns: `reference, member_id, airline_code, partner_code, base_amount,
/// amount, promotion_id, transaction_date, status`
pub fn write_credits<W: Write>(engine: &Engine, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for record in engine.ledger().drain_journal() {
        wtr.serialize(record.as_ref())?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes the names and descriptions of a partner's promotions as a JSON
/// array.
pub fn write_promotion_names<W: Write>(engine: &Engine, partner_code: &str, mut writer: W) -> anyhow::Result<()> {
    let names = engine.promotion_names(partner_code);
    if names.is_empty() {
        tracing::warn!(partner = partner_code, "no promotions for partner");
    }
    serde_json::to_writer_pretty(&mut writer, &names)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use loyalty_engine_rs::PromotionId;
    use rust_decimal_macros::dec;
    use std::io::Cursor;

    const CATALOG: &str = r#"[{
        "id": 8,
        "airline_code": "GJP",
        "partner_code": "DBS",
        "expiry": "2030-01-01T00:00:00Z",
        "conditions": {
            "monthly_spending": { "op": "gt", "value": 1500 },
            "black_card_holder": { "op": "eq", "value": "true" }
        },
        "points_rule": { "point_condition": [["x > 500", "x * 1.5"]] }
    }]"#;

    fn engine() -> Engine {
        Engine::new(Catalog::from_json(CATALOG).unwrap())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn parse_eligible_transaction() {
        let engine = engine();
        let csv = "member_id,airline_code,partner_code,amount,monthly_spending,black_card_holder\n\
                   1234567890,GJP,DBS,1000,2000,true\n";

        let credited = process_transactions(&engine, Cursor::new(csv), now()).unwrap();

        assert_eq!(credited, 1);
        let record = &engine.credits_for_member("1234567890")[0];
        assert_eq!(record.amount, dec!(1500));
        assert_eq!(record.promotion_id, Some(PromotionId(8)));
    }

    #[test]
    fn empty_attribute_cells_are_omitted() {
        let engine = engine();
        let csv = "member_id,airline_code,partner_code,amount,monthly_spending,black_card_holder\n\
                   1234567890,GJP,DBS,1000,2000,\n";

        process_transactions(&engine, Cursor::new(csv), now()).unwrap();

        let record = &engine.credits_for_member("1234567890")[0];
        assert_eq!(record.amount, dec!(1000));
        assert_eq!(record.promotion_id, None);
    }

    #[test]
    fn expired_promotions_are_ignored() {
        let engine = engine();
        let csv = "member_id,airline_code,partner_code,amount,monthly_spending,black_card_holder\n\
                   1234567890,GJP,DBS,1000,2000,true\n";
        let later = Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap();

        process_transactions(&engine, Cursor::new(csv), later).unwrap();

        assert_eq!(engine.credits_for_member("1234567890")[0].amount, dec!(1000));
    }

    #[test]
    fn skip_invalid_rows() {
        let engine = engine();
        let csv = "member_id,airline_code,partner_code,amount\n\
                   A1,GJP,DBS,100\n\
                   A2,GJP,DBS,not-a-number\n\
                   ,GJP,DBS,100\n\
                   A3,GJP\n\
                   A4,GJP,DBS,50\n";

        let credited = process_transactions(&engine, Cursor::new(csv), now()).unwrap();

        assert_eq!(credited, 2);
        assert_eq!(engine.ledger().len(), 2);
    }

    #[test]
    fn rejects_unexpected_header() {
        let engine = engine();
        let csv = "type,client,tx,amount\ndeposit,1,1,100.0\n";
        assert!(process_transactions(&engine, Cursor::new(csv), now()).is_err());
    }

    #[test]
    fn write_credits_in_commit_order() {
        let engine = engine();
        let csv = "member_id,airline_code,partner_code,amount\n\
                   A1,GJP,DBS,100\n\
                   A2,GJP,DBS,200\n";
        process_transactions(&engine, Cursor::new(csv), now()).unwrap();

        let mut output = Vec::new();
        write_credits(&engine, &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines[0],
            "reference,member_id,airline_code,partner_code,base_amount,amount,promotion_id,transaction_date,status"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains(",A1,GJP,DBS,100,100,,"));
        assert!(lines[2].contains(",A2,GJP,DBS,200,200,,"));
        assert!(lines[1].ends_with(",In Progress"));
    }

    #[test]
    fn names_are_written_as_json() {
        let engine = engine();
        let mut output = Vec::new();
        write_promotion_names(&engine, "DBS", &mut output).unwrap();

        let names: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(names, serde_json::json!([{ "id": 8, "name": "", "description": "" }]));

        let mut output = Vec::new();
        write_promotion_names(&engine, "UOB", &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap().trim(), "[]");
    }

    #[test]
    fn names_flag_makes_input_optional() {
        let args =
            Args::try_parse_from(["loyalty-engine-rs", "-p", "promotions.json", "--names", "DBS"]).unwrap();
        assert_eq!(args.names.as_deref(), Some("DBS"));
        assert_eq!(args.input, None);

        assert!(Args::try_parse_from(["loyalty-engine-rs", "-p", "promotions.json"]).is_err());
    }
}
