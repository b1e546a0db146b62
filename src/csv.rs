// CSV rendering
//
// Comma-delimited, UTF-8, \n line endings. Fields containing a comma,
// a double quote, or a line break are quoted with "" escaping. The full
// document is rendered in memory so the caller can write it in one shot.

use std::io::{self, Write};

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV row to any writer.
pub fn write_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, ",")?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            let escaped = cell.replace('"', "\"\"");
            write!(w, "\"{}\"", escaped)?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// Render a header row plus data rows into one CSV string.
///
/// The header line is always emitted, even for zero columns, so a document
/// with N data rows always has exactly N+1 lines.
pub fn render(header: &[String], rows: &[Vec<String>]) -> String {
    let mut buf: Vec<u8> = Vec::new();

    // Writing to a Vec<u8> cannot fail.
    let _ = write_row(&mut buf, header);
    for row in rows {
        let _ = write_row(&mut buf, row);
    }

    match String::from_utf8(buf) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(&e.into_bytes()).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_to_string(row: &[String]) -> String {
        let mut buf = Vec::new();
        write_row(&mut buf, row).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plain_row() {
        assert_eq!(row_to_string(&cells(&["a", "b", "c"])), "a,b,c\n");
    }

    #[test]
    fn test_empty_cells_are_preserved() {
        assert_eq!(row_to_string(&cells(&["a", "", "c"])), "a,,c\n");
    }

    #[test]
    fn test_comma_forces_quotes() {
        assert_eq!(
            row_to_string(&cells(&["12.5", "mg/dL, fasting"])),
            "12.5,\"mg/dL, fasting\"\n"
        );
    }

    #[test]
    fn test_quote_is_doubled() {
        assert_eq!(
            row_to_string(&cells(&["said \"ok\""])),
            "\"said \"\"ok\"\"\"\n"
        );
    }

    #[test]
    fn test_line_breaks_force_quotes() {
        assert_eq!(row_to_string(&cells(&["a\nb"])), "\"a\nb\"\n");
        assert_eq!(row_to_string(&cells(&["a\r\nb"])), "\"a\r\nb\"\n");
    }

    #[test]
    fn test_render_header_and_rows() {
        let header = cells(&["name", "date", "id"]);
        let rows = vec![
            cells(&["CBC", "2023-01-01", "r1"]),
            cells(&["Lipid", "2023-02-01", "r2"]),
        ];
        assert_eq!(
            render(&header, &rows),
            "name,date,id\nCBC,2023-01-01,r1\nLipid,2023-02-01,r2\n"
        );
    }

    #[test]
    fn test_render_zero_rows_is_header_only() {
        let header = cells(&["name", "date", "id"]);
        assert_eq!(render(&header, &[]), "name,date,id\n");
        assert_eq!(render(&header, &[]).lines().count(), 1);
    }

    #[test]
    fn test_render_no_columns_is_single_empty_line() {
        assert_eq!(render(&[], &[]), "\n");
    }
}
