use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Single-line JSON, for streams of records (daemon output).
pub fn print_json_line<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Left-aligned columns separated by two spaces, with a dashed rule under
/// the header.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(String::len)
                .fold(h.len(), usize::max)
        })
        .collect();

    print_row(&widths, headers.iter().copied());
    print_row(&widths, widths.iter().map(|&w| "-".repeat(w)));
    for row in &rows {
        print_row(&widths, row.iter().map(String::as_str));
    }
}

fn print_row<S: AsRef<str>>(widths: &[usize], cells: impl Iterator<Item = S>) {
    let line = cells
        .zip(widths)
        .map(|(cell, &width)| format!("{:width$}", cell.as_ref()))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", line.trim_end());
}
