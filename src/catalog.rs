//! Vendor datasheet catalogue loader
//!
//! Parses the `datasheet.csv`-shaped chip catalogue into an in-memory table.
//! The format is deliberately loose: comma- or tab-separated, column order
//! discovered from the header by substring match, every numeric field
//! optional. A catalogue that cannot be read at all is simply empty; the
//! engine then degrades to NA cells instead of failing the run.

use std::io::BufRead;

use serde::Serialize;

use crate::model::normalize_jedec;

/// One catalogue entry. Text fields are empty strings when the column is
/// missing; numeric fields are `None` when missing, unparseable, or
/// non-positive (datasheets never publish zero or negative timings).
#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogRow {
    /// Normalised six-hex-digit JEDEC id; `None` marks the row JEDEC-less.
    pub jedec: Option<String>,
    pub model: String,
    pub company: String,
    pub family: String,
    pub capacity_mbit: Option<u32>,
    /// Typical 4KB sector erase (ms).
    pub typ_4k_ms: Option<f32>,
    /// Typical 32KB block erase (ms).
    pub typ_32k_ms: Option<f32>,
    /// Typical 64KB block erase (ms).
    pub typ_64k_ms: Option<f32>,
    /// Typical page program per 256B page (ms).
    pub typ_page_ms: Option<f32>,
    /// Datasheet read throughput at 50 MHz SCK (MB/s).
    pub read50_mbps: Option<f32>,
}

impl CatalogRow {
    /// Capacity in bytes derived from the megabit figure.
    pub fn capacity_bytes(&self) -> Option<u32> {
        self.capacity_mbit
            .map(|mbit| ((f64::from(mbit) / 8.0) * 1024.0 * 1024.0).round() as u32)
    }
}

/// Column positions discovered from the header line.
#[derive(Debug, Default)]
struct ColumnMap {
    model: Option<usize>,
    company: Option<usize>,
    family: Option<usize>,
    capacity_mbit: Option<usize>,
    jedec: Option<usize>,
    typ_page: Option<usize>,
    typ_4k: Option<usize>,
    typ_32k: Option<usize>,
    typ_64k: Option<usize>,
    read50: Option<usize>,
}

impl ColumnMap {
    fn from_header(fields: &[&str]) -> Self {
        let mut map = ColumnMap::default();
        for (i, raw) in fields.iter().enumerate() {
            let name = raw.trim().to_ascii_uppercase();
            if name.contains("CHIP_MODEL") {
                map.model = map.model.or(Some(i));
            } else if name.contains("COMPANY") {
                map.company = map.company.or(Some(i));
            } else if name.contains("CHIP_FAMILY") {
                map.family = map.family.or(Some(i));
            } else if name.contains("CAPACITY") && name.contains("MBIT") {
                map.capacity_mbit = map.capacity_mbit.or(Some(i));
            } else if name.contains("JEDEC") {
                map.jedec = map.jedec.or(Some(i));
            } else if name.contains("TYP_PAGE_PROGRAM") {
                map.typ_page = map.typ_page.or(Some(i));
            } else if name.contains("TYP_4KB") {
                map.typ_4k = map.typ_4k.or(Some(i));
            } else if name.contains("TYP_32KB") {
                map.typ_32k = map.typ_32k.or(Some(i));
            } else if name.contains("TYP_64KB") {
                map.typ_64k = map.typ_64k.or(Some(i));
            } else if name.contains("50MHZ_READ_SPEED")
                || name.contains("50MHZ_READ")
                || name.contains("READ50")
            {
                map.read50 = map.read50.or(Some(i));
            }
        }
        map
    }
}

/// The in-memory catalogue. Row order is insertion order, which downstream
/// tie-breaking depends on.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    rows: Vec<CatalogRow>,
}

/// Split a catalogue line on its separator: comma when the line contains
/// one, tab otherwise.
fn split_fields(line: &str) -> Vec<&str> {
    let sep = if line.contains(',') { ',' } else { '\t' };
    line.split(sep).collect()
}

fn parse_positive_f32(field: &str) -> Option<f32> {
    field.trim().parse::<f32>().ok().filter(|v| *v > 0.0)
}

fn parse_positive_u32(field: &str) -> Option<u32> {
    field.trim().parse::<u32>().ok().filter(|v| *v > 0)
}

fn text_field(fields: &[&str], idx: Option<usize>) -> String {
    idx.and_then(|i| fields.get(i))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

impl Catalog {
    /// Load a catalogue from a byte stream. Never fails: unreadable input,
    /// a missing header, or garbage lines all degrade to fewer (possibly
    /// zero) rows.
    pub fn from_reader<R: BufRead>(mut reader: R) -> Catalog {
        let mut buf = Vec::new();
        let mut header: Option<ColumnMap> = None;
        let mut rows = Vec::new();
        let mut skipped = 0usize;

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(_) => break,
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let fields = split_fields(line);
            if let Some(map) = &header {
                if fields.len() <= 1 {
                    skipped += 1;
                    continue;
                }
                rows.push(Self::parse_row(map, &fields));
            } else {
                header = Some(ColumnMap::from_header(&fields));
            }
        }

        if skipped > 0 {
            tracing::debug!(skipped, "catalogue lines skipped");
        }
        Catalog { rows }
    }

    fn parse_row(map: &ColumnMap, fields: &[&str]) -> CatalogRow {
        CatalogRow {
            jedec: map
                .jedec
                .and_then(|i| fields.get(i))
                .and_then(|s| normalize_jedec(s)),
            model: text_field(fields, map.model),
            company: text_field(fields, map.company),
            family: text_field(fields, map.family),
            capacity_mbit: map
                .capacity_mbit
                .and_then(|i| fields.get(i))
                .and_then(|s| parse_positive_u32(s)),
            typ_4k_ms: map
                .typ_4k
                .and_then(|i| fields.get(i))
                .and_then(|s| parse_positive_f32(s)),
            typ_32k_ms: map
                .typ_32k
                .and_then(|i| fields.get(i))
                .and_then(|s| parse_positive_f32(s)),
            typ_64k_ms: map
                .typ_64k
                .and_then(|i| fields.get(i))
                .and_then(|s| parse_positive_f32(s)),
            typ_page_ms: map
                .typ_page
                .and_then(|i| fields.get(i))
                .and_then(|s| parse_positive_f32(s)),
            read50_mbps: map
                .read50
                .and_then(|i| fields.get(i))
                .and_then(|s| parse_positive_f32(s)),
        }
    }

    pub fn rows(&self) -> &[CatalogRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row whose normalised JEDEC equals `jedec`, with its index.
    pub fn find_by_jedec(&self, jedec: &str) -> Option<(usize, &CatalogRow)> {
        self.rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.jedec.as_deref() == Some(jedec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "JEDEC ID,CHIP_MODEL,COMPANY,CHIP_FAMILY,CAPACITY (MBIT),TYP_PAGE_PROGRAM_MS,TYP_4KB_ERASE_MS,TYP_32KB_ERASE_MS,TYP_64KB_ERASE_MS,50MHZ_READ_SPEED_MBPS";

    fn load(text: &str) -> Catalog {
        Catalog::from_reader(Cursor::new(text.as_bytes()))
    }

    #[test]
    fn test_load_basic_row() {
        let cat = load(&format!(
            "{HEADER}\nBF2641,SST26VF016B,Microchip,SST26,16,0.25,45,240,400,5.0\n"
        ));
        assert_eq!(cat.len(), 1);
        let row = &cat.rows()[0];
        assert_eq!(row.jedec.as_deref(), Some("BF2641"));
        assert_eq!(row.model, "SST26VF016B");
        assert_eq!(row.company, "Microchip");
        assert_eq!(row.family, "SST26");
        assert_eq!(row.capacity_mbit, Some(16));
        assert_eq!(row.typ_page_ms, Some(0.25));
        assert_eq!(row.typ_4k_ms, Some(45.0));
        assert_eq!(row.typ_32k_ms, Some(240.0));
        assert_eq!(row.typ_64k_ms, Some(400.0));
        assert_eq!(row.read50_mbps, Some(5.0));
    }

    #[test]
    fn test_capacity_bytes_derivation() {
        let cat = load(&format!("{HEADER}\nBF2641,X,Y,Z,16,,,,,\n"));
        assert_eq!(cat.rows()[0].capacity_bytes(), Some(2_097_152));
    }

    #[test]
    fn test_tab_separated_catalogue() {
        let header = HEADER.replace(',', "\t");
        let cat = load(&format!("{header}\nBF2641\tX\tY\tZ\t16\t\t\t\t\t5.0\n"));
        assert_eq!(cat.len(), 1);
        assert_eq!(cat.rows()[0].read50_mbps, Some(5.0));
        assert_eq!(cat.rows()[0].capacity_mbit, Some(16));
    }

    #[test]
    fn test_missing_numeric_fields_stay_absent() {
        let cat = load(&format!("{HEADER}\nBF2641,X,Y,Z,,n/a,,-1,0,\n"));
        let row = &cat.rows()[0];
        assert_eq!(row.capacity_mbit, None);
        assert_eq!(row.typ_page_ms, None);
        assert_eq!(row.typ_4k_ms, None);
        assert_eq!(row.typ_32k_ms, None); // negative is not a timing
        assert_eq!(row.typ_64k_ms, None); // zero is not a timing
        assert_eq!(row.read50_mbps, None);
    }

    #[test]
    fn test_bad_jedec_marks_row_jedec_less() {
        let cat = load(&format!("{HEADER}\nBF26,X,Y,Z,16,,,,,5.0\n"));
        assert_eq!(cat.rows()[0].jedec, None);
        // The row itself is still present and usable for timing comparisons.
        assert_eq!(cat.rows()[0].read50_mbps, Some(5.0));
    }

    #[test]
    fn test_jedec_normalised_from_punctuated_form() {
        let cat = load(&format!("{HEADER}\n0xbf 26 41,X,Y,Z,,,,,,\n"));
        assert_eq!(cat.rows()[0].jedec.as_deref(), Some("BF2641"));
    }

    #[test]
    fn test_short_lines_skipped() {
        let cat = load(&format!("{HEADER}\njustonefield\nBF2641,X\n"));
        assert_eq!(cat.len(), 1);
        assert_eq!(cat.rows()[0].model, "X");
    }

    #[test]
    fn test_empty_input_is_empty_catalogue() {
        assert!(load("").is_empty());
        assert!(load("\n\n").is_empty());
    }

    #[test]
    fn test_header_only_is_empty_catalogue() {
        assert!(load(&format!("{HEADER}\n")).is_empty());
    }

    #[test]
    fn test_find_by_jedec_first_match_wins() {
        let cat = load(&format!(
            "{HEADER}\nBF2641,first,,,,,,,,\nBF2641,second,,,,,,,,\nC21F17,other,,,,,,,,\n"
        ));
        let (idx, row) = cat.find_by_jedec("BF2641").unwrap();
        assert_eq!(idx, 0);
        assert_eq!(row.model, "first");
        assert!(cat.find_by_jedec("ABCDEF").is_none());
    }

    #[test]
    fn test_header_substring_matching_is_case_insensitive() {
        let cat = load("jedec id,chip_model,typ_4kb (ms)\nBF2641,X,45\n");
        let row = &cat.rows()[0];
        assert_eq!(row.jedec.as_deref(), Some("BF2641"));
        assert_eq!(row.model, "X");
        assert_eq!(row.typ_4k_ms, Some(45.0));
    }

    #[test]
    fn test_row_order_is_preserved() {
        let cat = load(&format!(
            "{HEADER}\n111111,a,,,,,,,,\n222222,b,,,,,,,,\n333333,c,,,,,,,,\n"
        ));
        let models: Vec<_> = cat.rows().iter().map(|r| r.model.as_str()).collect();
        assert_eq!(models, ["a", "b", "c"]);
    }
}
