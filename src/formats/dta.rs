// Stata .dta reader (releases 113-115 and 117-119).
//
// Modern .dta files are a sequence of tagged sections
// (`<header>`, `<map>`, `<variable_types>`, ..., `<data>`, `<strls>`).
// The `<map>` section holds absolute offsets for every section, which lets
// us skip `<characteristics>` without parsing it. Field widths differ
// between releases:
//
//   release  K    N    label len  varname  format  value label  var label  strL (v,o)
//   117      u16  u32  u8         33       49      33           81         4+4
//   118      u16  u64  u16        129      57      129          321        2+6
//   119      u32  u64  u16        129      57      129          321        3+5
//
// Releases 113-115 (Stata 8 to 12) predate the tagged layout: a fixed
// binary header, the same descriptor lists without tags, a run of
// expansion fields, then the data. They have no strLs.
//
// Numeric columns use sentinel ranges for missing values (`.`, `.a`-`.z`);
// those become empty cells. Columns with a `%td` (days) or `%tc`/`%tC`
// (milliseconds) display format count from 1 Jan 1960 and become date
// cells.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeDelta};
use tracing::info;

use crate::sheet::{Cell, Table};

/// Largest non-missing values per integer storage type.
const BYTE_MAX: i8 = 100;
const INT_MAX: i16 = 32_740;
const LONG_MAX: i32 = 2_147_483_620;
/// Floating-point missing values start at 2^127 (float) and 2^1023 (double).
const FLOAT_MISSING_BITS: u32 = 0x7f00_0000;
const DOUBLE_MISSING_BITS: u64 = 0x7fe0_0000_0000_0000;

/// Variable storage types in the `<variable_types>` section.
const TYPE_STRL: u16 = 32_768;
const TYPE_DOUBLE: u16 = 65_526;
const TYPE_FLOAT: u16 = 65_527;
const TYPE_LONG: u16 = 65_528;
const TYPE_INT: u16 = 65_529;
const TYPE_BYTE: u16 = 65_530;

/// Index of the `<data>` and `<strls>` offsets within `<map>`.
const MAP_DATA: usize = 9;
const MAP_STRLS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

/// Dataset-level metadata from the header and descriptor sections.
#[derive(Debug, Clone, PartialEq)]
pub struct DtaMeta {
    pub release: u16,
    pub byte_order: ByteOrder,
    pub observations: u64,
    pub data_label: String,
    pub timestamp: String,
    pub column_names: Vec<String>,
    pub column_labels: Vec<String>,
    pub formats: Vec<String>,
}

/// Read a .dta file into a table plus its metadata.
pub fn read_dta(path: &Path) -> Result<(Table, DtaMeta)> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let (table, meta) =
        parse_dta(&bytes).with_context(|| format!("Failed to parse Stata file {}", path.display()))?;
    info!(
        path = %path.display(),
        release = meta.release,
        rows = table.len(),
        columns = table.headers.len(),
        "Loaded Stata dataset"
    );
    Ok((table, meta))
}

/// Parse .dta bytes.
pub fn parse_dta(bytes: &[u8]) -> Result<(Table, DtaMeta)> {
    if !bytes.starts_with(b"<stata_dta>") {
        return match bytes.first() {
            Some(&v) if (113..=115).contains(&v) => parse_binary(bytes),
            Some(&v) if (102..=112).contains(&v) => anyhow::bail!(
                "Stata release {v} (pre-Stata 8) is not supported; \
                 re-save the dataset with Stata 8 or later"
            ),
            _ => anyhow::bail!("Not a Stata .dta file"),
        };
    }

    let mut cur = Cursor::new(bytes);
    cur.expect_tag("<stata_dta>")?;
    cur.expect_tag("<header>")?;

    cur.expect_tag("<release>")?;
    let release: u16 = std::str::from_utf8(cur.take(3)?)?
        .parse()
        .context("Unreadable release number")?;
    if !(117..=119).contains(&release) {
        anyhow::bail!("Stata release {release} is not supported (expected 117, 118 or 119)");
    }
    cur.expect_tag("</release>")?;
    let layout = Layout::for_release(release);

    cur.expect_tag("<byteorder>")?;
    cur.order = match cur.take(3)? {
        b"LSF" => ByteOrder::Little,
        b"MSF" => ByteOrder::Big,
        other => anyhow::bail!("Unknown byte order {:?}", String::from_utf8_lossy(other)),
    };
    cur.expect_tag("</byteorder>")?;

    cur.expect_tag("<K>")?;
    let nvar = cur.uint(layout.k_width)? as usize;
    cur.expect_tag("</K>")?;

    cur.expect_tag("<N>")?;
    let nobs = cur.uint(layout.n_width)?;
    cur.expect_tag("</N>")?;

    cur.expect_tag("<label>")?;
    let label_len = cur.uint(layout.label_len_width)? as usize;
    let data_label = layout.decode(cur.take(label_len)?);
    cur.expect_tag("</label>")?;

    cur.expect_tag("<timestamp>")?;
    let ts_len = cur.uint(1)? as usize;
    let timestamp = layout.decode(cur.take(ts_len)?);
    cur.expect_tag("</timestamp>")?;
    cur.expect_tag("</header>")?;

    cur.expect_tag("<map>")?;
    let mut map = [0u64; 14];
    for slot in map.iter_mut() {
        *slot = cur.uint(8)?;
    }
    cur.expect_tag("</map>")?;

    cur.expect_tag("<variable_types>")?;
    let types = (0..nvar)
        .map(|_| cur.uint(2).map(|t| t as u16))
        .collect::<Result<Vec<_>>>()?;
    cur.expect_tag("</variable_types>")?;

    cur.expect_tag("<varnames>")?;
    let column_names = cur.fixed_strings(nvar, layout.name_len, &layout)?;
    cur.expect_tag("</varnames>")?;

    cur.expect_tag("<sortlist>")?;
    cur.take((nvar + 1) * layout.sort_width)?;
    cur.expect_tag("</sortlist>")?;

    cur.expect_tag("<formats>")?;
    let formats = cur.fixed_strings(nvar, layout.format_len, &layout)?;
    cur.expect_tag("</formats>")?;

    cur.expect_tag("<value_label_names>")?;
    cur.take(nvar * layout.name_len)?;
    cur.expect_tag("</value_label_names>")?;

    cur.expect_tag("<variable_labels>")?;
    let column_labels = cur.fixed_strings(nvar, layout.var_label_len, &layout)?;
    cur.expect_tag("</variable_labels>")?;

    // Resolve long strings first so data cells can be filled in one pass
    cur.seek(map[MAP_STRLS])?;
    let strls = read_strls(&mut cur, &layout)?;

    cur.seek(map[MAP_DATA])?;
    cur.expect_tag("<data>")?;
    let rows = read_rows(&mut cur, nobs, &types, &layout, &strls)?;
    cur.expect_tag("</data>")?;

    let meta = DtaMeta {
        release,
        byte_order: cur.order,
        observations: nobs,
        data_label,
        timestamp,
        column_names,
        column_labels,
        formats,
    };
    Ok(finish(rows, meta))
}

/// Parse the untagged binary layout of releases 113-115.
fn parse_binary(bytes: &[u8]) -> Result<(Table, DtaMeta)> {
    let mut cur = Cursor::new(bytes);
    let release = cur.uint(1)? as u16;
    cur.order = match cur.uint(1)? {
        1 => ByteOrder::Big,
        2 => ByteOrder::Little,
        other => anyhow::bail!("Unknown byte order flag {other}"),
    };
    // filetype, unused
    cur.take(2)?;
    let layout = Layout::for_release(release);

    let nvar = cur.uint(layout.k_width)? as usize;
    let nobs = cur.uint(layout.n_width)?;
    let data_label = layout.decode_padded(cur.take(layout.var_label_len)?);
    let timestamp = layout.decode_padded(cur.take(18)?);

    let types = (0..nvar)
        .map(|_| cur.uint(1).and_then(|t| binary_type(t as u8)))
        .collect::<Result<Vec<_>>>()?;
    let column_names = cur.fixed_strings(nvar, layout.name_len, &layout)?;
    cur.take((nvar + 1) * layout.sort_width)?;
    let formats = cur.fixed_strings(nvar, layout.format_len, &layout)?;
    // value label names
    cur.take(nvar * layout.name_len)?;
    let column_labels = cur.fixed_strings(nvar, layout.var_label_len, &layout)?;

    // Expansion fields end with a zero type and zero length
    loop {
        let kind = cur.uint(1)?;
        let len = cur.uint(4)? as usize;
        if kind == 0 && len == 0 {
            break;
        }
        cur.take(len)?;
    }

    let rows = read_rows(&mut cur, nobs, &types, &layout, &HashMap::new())?;

    let meta = DtaMeta {
        release,
        byte_order: cur.order,
        observations: nobs,
        data_label,
        timestamp,
        column_names,
        column_labels,
        formats,
    };
    Ok(finish(rows, meta))
}

/// Map a one-byte storage type from the binary layout onto the codes used
/// by `<variable_types>`.
fn binary_type(code: u8) -> Result<u16> {
    Ok(match code {
        1..=244 => code as u16,
        251 => TYPE_BYTE,
        252 => TYPE_INT,
        253 => TYPE_LONG,
        254 => TYPE_FLOAT,
        255 => TYPE_DOUBLE,
        other => anyhow::bail!("Unknown Stata variable type {other}"),
    })
}

fn read_rows(
    cur: &mut Cursor<'_>,
    nobs: u64,
    types: &[u16],
    layout: &Layout,
    strls: &HashMap<(u64, u64), String>,
) -> Result<Vec<Vec<Cell>>> {
    let mut rows = Vec::with_capacity(nobs.min(1 << 20) as usize);
    for _ in 0..nobs {
        let mut row = Vec::with_capacity(types.len());
        for &t in types {
            row.push(read_value(cur, t, layout, strls)?);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn finish(mut rows: Vec<Vec<Cell>>, meta: DtaMeta) -> (Table, DtaMeta) {
    apply_time_formats(&mut rows, &meta.formats);
    (Table::new(meta.column_names.clone(), rows), meta)
}

/// Release-dependent field widths.
struct Layout {
    release: u16,
    k_width: usize,
    n_width: usize,
    label_len_width: usize,
    name_len: usize,
    sort_width: usize,
    format_len: usize,
    var_label_len: usize,
    /// Widths of the `v` and `o` parts of a strL reference in the data section
    strl_v_width: usize,
    strl_o_width: usize,
    /// Width of `o` inside a GSO entry
    gso_o_width: usize,
}

impl Layout {
    fn for_release(release: u16) -> Self {
        match release {
            113..=115 => Self {
                release,
                k_width: 2,
                n_width: 4,
                label_len_width: 0,
                name_len: 33,
                sort_width: 2,
                format_len: if release == 113 { 12 } else { 49 },
                var_label_len: 81,
                strl_v_width: 0,
                strl_o_width: 0,
                gso_o_width: 0,
            },
            117 => Self {
                release,
                k_width: 2,
                n_width: 4,
                label_len_width: 1,
                name_len: 33,
                sort_width: 2,
                format_len: 49,
                var_label_len: 81,
                strl_v_width: 4,
                strl_o_width: 4,
                gso_o_width: 4,
            },
            118 => Self {
                release,
                k_width: 2,
                n_width: 8,
                label_len_width: 2,
                name_len: 129,
                sort_width: 2,
                format_len: 57,
                var_label_len: 321,
                strl_v_width: 2,
                strl_o_width: 6,
                gso_o_width: 8,
            },
            _ => Self {
                release,
                k_width: 4,
                n_width: 8,
                label_len_width: 2,
                name_len: 129,
                sort_width: 4,
                format_len: 57,
                var_label_len: 321,
                strl_v_width: 3,
                strl_o_width: 5,
                gso_o_width: 8,
            },
        }
    }

    /// 117 and earlier store Latin-1 text; later releases store UTF-8.
    fn decode(&self, raw: &[u8]) -> String {
        if self.release <= 117 {
            raw.iter().map(|&b| b as char).collect()
        } else {
            String::from_utf8_lossy(raw).into_owned()
        }
    }

    /// Decode a fixed-width, NUL-padded field.
    fn decode_padded(&self, raw: &[u8]) -> String {
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        self.decode(&raw[..end])
    }
}

fn read_strls(cur: &mut Cursor<'_>, layout: &Layout) -> Result<HashMap<(u64, u64), String>> {
    cur.expect_tag("<strls>")?;
    let mut strls = HashMap::new();
    while cur.peek(b"GSO") {
        cur.take(3)?;
        let v = cur.uint(4)?;
        let o = cur.uint(layout.gso_o_width)?;
        let kind = cur.uint(1)?;
        let len = cur.uint(4)? as usize;
        let raw = cur.take(len)?;
        let text = match kind {
            // ASCII/UTF-8 strings carry a trailing NUL
            130 => layout.decode_padded(raw),
            _ => String::from_utf8_lossy(raw).into_owned(),
        };
        strls.insert((v, o), text);
    }
    cur.expect_tag("</strls>")?;
    Ok(strls)
}

fn read_value(
    cur: &mut Cursor<'_>,
    var_type: u16,
    layout: &Layout,
    strls: &HashMap<(u64, u64), String>,
) -> Result<Cell> {
    let cell = match var_type {
        1..=2045 => {
            let s = layout.decode_padded(cur.take(var_type as usize)?);
            if s.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s)
            }
        }
        TYPE_STRL => {
            let (v, o) = cur.strl_ref(layout.strl_v_width, layout.strl_o_width)?;
            match strls.get(&(v, o)) {
                Some(s) if !s.is_empty() => Cell::Text(s.clone()),
                _ => Cell::Empty,
            }
        }
        TYPE_DOUBLE => {
            let v = f64::from_bits(cur.uint(8)?);
            if v.is_nan() || v >= f64::from_bits(DOUBLE_MISSING_BITS) {
                Cell::Empty
            } else {
                Cell::Number(v)
            }
        }
        TYPE_FLOAT => {
            let v = f32::from_bits(cur.uint(4)? as u32);
            if v.is_nan() || v >= f32::from_bits(FLOAT_MISSING_BITS) {
                Cell::Empty
            } else {
                Cell::Number(v as f64)
            }
        }
        TYPE_LONG => {
            let v = cur.uint(4)? as u32 as i32;
            if v > LONG_MAX {
                Cell::Empty
            } else {
                Cell::Int(v as i64)
            }
        }
        TYPE_INT => {
            let v = cur.uint(2)? as u16 as i16;
            if v > INT_MAX {
                Cell::Empty
            } else {
                Cell::Int(v as i64)
            }
        }
        TYPE_BYTE => {
            let v = cur.uint(1)? as u8 as i8;
            if v > BYTE_MAX {
                Cell::Empty
            } else {
                Cell::Int(v as i64)
            }
        }
        other => anyhow::bail!("Unknown Stata variable type {other}"),
    };
    Ok(cell)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeFormat {
    /// Days since 1 Jan 1960
    Date,
    /// Milliseconds since 1 Jan 1960 00:00:00
    DateTime,
}

/// Recognize Stata date display formats, including left-aligned (`%-td`)
/// and pre-Stata 10 (`%d`) spellings.
fn time_format(format: &str) -> Option<TimeFormat> {
    let body = format.strip_prefix('%')?;
    let body = body.strip_prefix('-').unwrap_or(body);
    if body.starts_with("td") || body.starts_with('d') {
        Some(TimeFormat::Date)
    } else if body.starts_with("tc") || body.starts_with("tC") {
        Some(TimeFormat::DateTime)
    } else {
        None
    }
}

fn apply_time_formats(rows: &mut [Vec<Cell>], formats: &[String]) {
    let columns: Vec<(usize, TimeFormat)> = formats
        .iter()
        .enumerate()
        .filter_map(|(i, f)| time_format(f).map(|kind| (i, kind)))
        .collect();
    if columns.is_empty() {
        return;
    }

    for row in rows.iter_mut() {
        for &(i, kind) in &columns {
            if let Some(converted) = stata_time(&row[i], kind) {
                row[i] = converted;
            }
        }
    }
}

/// Convert a numeric cell to a date; `None` leaves the cell unchanged
/// (missing, non-numeric, or out of chrono's range).
fn stata_time(cell: &Cell, kind: TimeFormat) -> Option<Cell> {
    let value = match cell {
        Cell::Int(i) => *i as f64,
        Cell::Number(n) => *n,
        _ => return None,
    };
    let epoch = NaiveDate::from_ymd_opt(1960, 1, 1)?;
    match kind {
        TimeFormat::Date => {
            let days = TimeDelta::try_days(value.floor() as i64)?;
            epoch.checked_add_signed(days).map(Cell::Date)
        }
        TimeFormat::DateTime => {
            let millis = TimeDelta::try_milliseconds(value.round() as i64)?;
            epoch
                .and_hms_opt(0, 0, 0)?
                .checked_add_signed(millis)
                .map(Cell::DateTime)
        }
    }
}

/// Bounds-checked reader over the file bytes.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            order: ByteOrder::Little,
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| anyhow::anyhow!("Unexpected end of file at byte {}", self.pos))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn peek(&self, bytes: &[u8]) -> bool {
        self.buf[self.pos.min(self.buf.len())..].starts_with(bytes)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        let offset = usize::try_from(offset).context("Section offset out of range")?;
        if offset > self.buf.len() {
            anyhow::bail!("Section offset {offset} is past the end of the file");
        }
        self.pos = offset;
        Ok(())
    }

    fn expect_tag(&mut self, tag: &str) -> Result<()> {
        let at = self.pos;
        let found = self.take(tag.len())?;
        if found != tag.as_bytes() {
            anyhow::bail!(
                "Expected {tag} at byte {at}, found {:?}",
                String::from_utf8_lossy(found)
            );
        }
        Ok(())
    }

    /// Unsigned integer of `width` bytes (1..=8) in the file's byte order.
    fn uint(&mut self, width: usize) -> Result<u64> {
        let raw = self.take(width)?;
        Ok(self.fold(raw))
    }

    fn fold(&self, raw: &[u8]) -> u64 {
        match self.order {
            ByteOrder::Little => raw
                .iter()
                .rev()
                .fold(0u64, |acc, &b| (acc << 8) | b as u64),
            ByteOrder::Big => raw.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64),
        }
    }

    /// A strL `(v, o)` reference packed into 8 bytes.
    ///
    /// In little-endian files `v` occupies the low-order bytes, which come
    /// first; in big-endian files it also comes first, as the high-order
    /// part.
    fn strl_ref(&mut self, v_width: usize, o_width: usize) -> Result<(u64, u64)> {
        let raw = self.take(v_width + o_width)?;
        let (v_raw, o_raw) = raw.split_at(v_width);
        Ok((self.fold(v_raw), self.fold(o_raw)))
    }

    fn fixed_strings(&mut self, count: usize, width: usize, layout: &Layout) -> Result<Vec<String>> {
        (0..count)
            .map(|_| self.take(width).map(|raw| layout.decode_padded(raw)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_format_spellings() {
        assert_eq!(time_format("%td"), Some(TimeFormat::Date));
        assert_eq!(time_format("%tdDD_Mon_CCYY"), Some(TimeFormat::Date));
        assert_eq!(time_format("%-td"), Some(TimeFormat::Date));
        assert_eq!(time_format("%d"), Some(TimeFormat::Date));
        assert_eq!(time_format("%tc"), Some(TimeFormat::DateTime));
        assert_eq!(time_format("%tCDDmonCCYY_HH:MM:SS"), Some(TimeFormat::DateTime));
        assert_eq!(time_format("%9.0g"), None);
        assert_eq!(time_format("%-12s"), None);
        assert_eq!(time_format("%tm"), None);
    }

    #[test]
    fn test_stata_time_leaves_text_alone() {
        assert_eq!(stata_time(&Cell::from("x"), TimeFormat::Date), None);
        assert_eq!(
            stata_time(&Cell::Int(0), TimeFormat::Date),
            NaiveDate::from_ymd_opt(1960, 1, 1).map(Cell::Date)
        );
    }
}
