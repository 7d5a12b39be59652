//! Pivoted CSV report writer
//!
//! Emits the fixed-schema report: columns are the three operations, rows
//! are metrics. The row set, row order, and cell formatting are a contract
//! with downstream tooling; absent values always serialise as the literal
//! `NA` so the report is syntactically complete no matter how little input
//! survived.

use std::io::{self, Write};

use crate::engine::ReportData;
use crate::model::SIZE_GROUPS;
use crate::stats::Summary;

const NA: &str = "NA";

const NOTES_READ: &str =
    "read: MB/s; db_mean_* = closest READ@SCK to measured mean per size; NA if no read data";
const NOTES_WRITE: &str =
    "write: ms/op; db_mean_* = typ_page_ms * ceil(bytes/256) closest to measured mean; NA if no write data";
const NOTES_ERASE: &str =
    "erase: ms/op; db_mean_* = typ_4K/32K/64K closest to measured mean; NA if no erase data";

/// Three decimals, or NA.
fn fmt_f3(v: Option<f32>) -> String {
    v.map_or_else(|| NA.to_string(), |v| format!("{v:.3}"))
}

/// Two decimals, or NA.
fn fmt_f2(v: Option<f32>) -> String {
    v.map_or_else(|| NA.to_string(), |v| format!("{v:.2}"))
}

/// Standard deviations close to zero need the extra digits to stay
/// distinguishable from an exact zero.
fn fmt_stddev(v: Option<f32>) -> String {
    match v {
        None => NA.to_string(),
        Some(v) if v.abs() > 0.0 && v.abs() < 1e-3 => format!("{v:.6}"),
        Some(v) => format!("{v:.3}"),
    }
}

/// Sample counts: an empty bucket reads as NA, not 0.
fn fmt_count(n: usize) -> String {
    if n == 0 {
        NA.to_string()
    } else {
        n.to_string()
    }
}

fn fmt_u32(v: Option<u32>) -> String {
    v.map_or_else(|| NA.to_string(), |v| v.to_string())
}

fn fmt_text(v: Option<&str>) -> &str {
    v.unwrap_or(NA)
}

/// Candidate lists join on `/`; empty means NA.
fn fmt_list(list: &[String]) -> String {
    if list.is_empty() {
        NA.to_string()
    } else {
        list.join("/")
    }
}

fn row<W: Write>(w: &mut W, title: &str, read: &str, write: &str, erase: &str) -> io::Result<()> {
    writeln!(w, "{title},{read},{write},{erase}")
}

fn replicated<W: Write>(w: &mut W, title: &str, value: &str) -> io::Result<()> {
    row(w, title, value, value, value)
}

fn stats_rows<W: Write>(
    w: &mut W,
    suffix: &str,
    read: &Summary,
    write: &Summary,
    erase: &Summary,
) -> io::Result<()> {
    row(
        w,
        &format!("n_{suffix}"),
        &fmt_count(read.n),
        &fmt_count(write.n),
        &fmt_count(erase.n),
    )?;
    row(
        w,
        &format!("avg_{suffix}_ms"),
        &fmt_f3(read.mean),
        &fmt_f3(write.mean),
        &fmt_f3(erase.mean),
    )?;
    row(
        w,
        &format!("p25_{suffix}_ms"),
        &fmt_f3(read.p25),
        &fmt_f3(write.p25),
        &fmt_f3(erase.p25),
    )?;
    row(
        w,
        &format!("p50_{suffix}_ms"),
        &fmt_f3(read.p50),
        &fmt_f3(write.p50),
        &fmt_f3(erase.p50),
    )?;
    row(
        w,
        &format!("p75_{suffix}_ms"),
        &fmt_f3(read.p75),
        &fmt_f3(write.p75),
        &fmt_f3(erase.p75),
    )?;
    row(
        w,
        &format!("min_{suffix}_ms"),
        &fmt_f3(read.min),
        &fmt_f3(write.min),
        &fmt_f3(erase.min),
    )?;
    row(
        w,
        &format!("max_{suffix}_ms"),
        &fmt_f3(read.max),
        &fmt_f3(write.max),
        &fmt_f3(erase.max),
    )?;
    row(
        w,
        &format!("stddev_{suffix}_ms"),
        &fmt_stddev(read.stddev),
        &fmt_stddev(write.stddev),
        &fmt_stddev(erase.stddev),
    )
}

/// Write the complete report. Fails only when the output stream does.
pub fn write_csv<W: Write>(w: &mut W, data: &ReportData) -> io::Result<()> {
    writeln!(w, "title,read,write,erase")?;

    // Identity rows carry the same value in all three columns.
    let id = &data.identity;
    replicated(w, "detected_jedec", fmt_text(id.detected_jedec.as_deref()))?;
    replicated(w, "chip_model", fmt_text(id.chip_model.as_deref()))?;
    replicated(w, "chip_family", fmt_text(id.chip_family.as_deref()))?;
    replicated(w, "company", fmt_text(id.company.as_deref()))?;
    replicated(w, "capacity_mbit", &fmt_u32(id.capacity_mbit))?;
    replicated(w, "capacity_bytes", &fmt_u32(id.capacity_bytes))?;

    replicated(w, "spi_sck_MHz", &fmt_f2(data.sck_mhz))?;
    replicated(w, "units_summary", "ms")?;

    for group in SIZE_GROUPS {
        let g = group.index();
        stats_rows(
            w,
            group.suffix(),
            &data.aggregates.read_lat_ms[g],
            &data.aggregates.write_ms[g],
            &data.aggregates.erase_ms[g],
        )?;
    }

    for group in SIZE_GROUPS {
        let g = group.index();
        row(
            w,
            &format!("db_mean_{}", group.suffix()),
            &fmt_f3(data.matches.read[g].db_mean),
            &fmt_f3(data.matches.write[g].db_mean),
            &fmt_f3(data.matches.erase[g].db_mean),
        )?;
    }

    for group in SIZE_GROUPS {
        let g = group.index();
        row(
            w,
            &format!("possible_chips_{}", group.suffix()),
            &fmt_list(&data.matches.read[g].candidates),
            &fmt_list(&data.matches.write[g].candidates),
            &fmt_list(&data.matches.erase[g].candidates),
        )?;
    }

    row(
        w,
        "conclusion_possible_chips",
        &fmt_list(&data.conclusion.read),
        &fmt_list(&data.conclusion.write),
        &fmt_list(&data.conclusion.erase),
    )?;

    row(w, "notes", NOTES_READ, NOTES_WRITE, NOTES_ERASE)?;

    // Spacer, then the conclusion block with its own header.
    writeln!(w)?;
    writeln!(
        w,
        "final_guess_jedec,final_guess_model,final_guess_company,final_score"
    )?;
    let guess = &data.final_guess;
    writeln!(
        w,
        "{},{},{},{}",
        guess.jedec,
        guess.model,
        guess.company,
        fmt_f3(guess.score)
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::build_report;
    use crate::model::DeviceContext;
    use std::io::Cursor;

    fn render(results: &str, catalog: &str, ctx: &DeviceContext) -> String {
        let data = build_report(
            Cursor::new(results.as_bytes().to_vec()),
            Cursor::new(catalog.as_bytes().to_vec()),
            ctx,
        );
        let mut out = Vec::new();
        write_csv(&mut out, &data).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_fmt_f3() {
        assert_eq!(fmt_f3(Some(0.81)), "0.810");
        assert_eq!(fmt_f3(Some(45.0)), "45.000");
        assert_eq!(fmt_f3(None), "NA");
    }

    #[test]
    fn test_fmt_f2() {
        assert_eq!(fmt_f2(Some(10.0)), "10.00");
        assert_eq!(fmt_f2(None), "NA");
    }

    #[test]
    fn test_fmt_stddev_extends_precision_near_zero() {
        assert_eq!(fmt_stddev(Some(0.0005)), "0.000500");
        assert_eq!(fmt_stddev(Some(0.0)), "0.000");
        assert_eq!(fmt_stddev(Some(1.5)), "1.500");
        assert_eq!(fmt_stddev(Some(-0.0002)), "-0.000200");
        assert_eq!(fmt_stddev(None), "NA");
    }

    #[test]
    fn test_fmt_count_zero_is_na() {
        assert_eq!(fmt_count(0), "NA");
        assert_eq!(fmt_count(3), "3");
    }

    #[test]
    fn test_fmt_list() {
        assert_eq!(fmt_list(&[]), "NA");
        assert_eq!(fmt_list(&["A".into()]), "A");
        assert_eq!(fmt_list(&["A".into(), "B".into()]), "A/B");
    }

    #[test]
    fn test_header_is_exact() {
        let report = render("", "", &DeviceContext::default());
        assert!(report.starts_with("title,read,write,erase\n"));
    }

    #[test]
    fn test_every_row_has_four_fields() {
        let report = render(
            "id,read,4096,0,800,0\nid,erase,4096,0,46000,0\n",
            "JEDEC ID,CHIP_MODEL,TYP_4KB_MS,50MHZ_READ\nBF2641,X,45,5.0\n",
            &DeviceContext::new("BF2641", 10_000_000, 0),
        );
        for line in report.lines().filter(|l| !l.is_empty()) {
            assert_eq!(line.split(',').count(), 4, "bad row: {line}");
        }
    }

    #[test]
    fn test_row_order_matches_schema() {
        let report = render("", "", &DeviceContext::default());
        let titles: Vec<String> = report
            .lines()
            .skip(1)
            .filter(|l| !l.is_empty())
            .map(|l| l.split(',').next().unwrap().to_string())
            .collect();

        let mut expected: Vec<String> = [
            "detected_jedec",
            "chip_model",
            "chip_family",
            "company",
            "capacity_mbit",
            "capacity_bytes",
            "spi_sck_MHz",
            "units_summary",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let suffixes = ["1B", "256B", "4096B", "32768B", "65536B", "WHOLE"];
        for suffix in suffixes {
            expected.push(format!("n_{suffix}"));
            for stat in ["avg", "p25", "p50", "p75", "min", "max", "stddev"] {
                expected.push(format!("{stat}_{suffix}_ms"));
            }
        }
        for suffix in suffixes {
            expected.push(format!("db_mean_{suffix}"));
        }
        for suffix in suffixes {
            expected.push(format!("possible_chips_{suffix}"));
        }
        expected.push("conclusion_possible_chips".to_string());
        expected.push("notes".to_string());
        expected.push("final_guess_jedec".to_string());
        expected.push("undecided".to_string());

        assert_eq!(titles, expected);
    }

    #[test]
    fn test_empty_inputs_render_all_na_summary() {
        let report = render("", "", &DeviceContext::default());
        assert!(report.contains("n_4096B,NA,NA,NA\n"));
        assert!(report.contains("avg_WHOLE_ms,NA,NA,NA\n"));
        assert!(report.contains("db_mean_1B,NA,NA,NA\n"));
        assert!(report.contains("possible_chips_65536B,NA,NA,NA\n"));
        assert!(report.contains("conclusion_possible_chips,NA,NA,NA\n"));
        assert!(report.contains("\nundecided,undecided,undecided,NA\n"));
    }

    #[test]
    fn test_units_row_fixed() {
        let report = render("", "", &DeviceContext::default());
        assert!(report.contains("units_summary,ms,ms,ms\n"));
    }

    #[test]
    fn test_single_sample_statistics_collapse() {
        let report = render("id,erase,4096,0,46000,0\n", "", &DeviceContext::default());
        assert!(report.contains("n_4096B,NA,NA,1\n"));
        assert!(report.contains("avg_4096B_ms,NA,NA,46.000\n"));
        assert!(report.contains("p25_4096B_ms,NA,NA,46.000\n"));
        assert!(report.contains("p75_4096B_ms,NA,NA,46.000\n"));
        assert!(report.contains("min_4096B_ms,NA,NA,46.000\n"));
        assert!(report.contains("max_4096B_ms,NA,NA,46.000\n"));
        assert!(report.contains("stddev_4096B_ms,NA,NA,0.000\n"));
    }

    #[test]
    fn test_sck_row_two_decimals() {
        let report = render("", "", &DeviceContext::new("", 10_000_000, 0));
        assert!(report.contains("spi_sck_MHz,10.00,10.00,10.00\n"));
    }

    #[test]
    fn test_final_guess_block_after_blank_line() {
        let report = render("", "", &DeviceContext::default());
        let blank_then_header =
            "\n\nfinal_guess_jedec,final_guess_model,final_guess_company,final_score\n";
        assert!(report.contains(blank_then_header));
        // Exactly one conclusion block.
        assert_eq!(report.matches("final_guess_jedec").count(), 1);
    }

    #[test]
    fn test_identity_rows_replicated() {
        let report = render(
            "",
            "JEDEC ID,CHIP_MODEL,COMPANY,CHIP_FAMILY,CAPACITY (MBIT)\nBF2641,X,Co,Fam,16\n",
            &DeviceContext::new("BF2641", 0, 0),
        );
        assert!(report.contains("detected_jedec,BF2641,BF2641,BF2641\n"));
        assert!(report.contains("chip_model,X,X,X\n"));
        assert!(report.contains("chip_family,Fam,Fam,Fam\n"));
        assert!(report.contains("company,Co,Co,Co\n"));
        assert!(report.contains("capacity_mbit,16,16,16\n"));
        assert!(report.contains("capacity_bytes,2097152,2097152,2097152\n"));
    }
}
