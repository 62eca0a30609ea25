use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};

/// Render rows under `header`, right-aligning the columns listed in `numeric`.
pub(crate) fn render<const N: usize>(
    header: [&str; N],
    rows: impl IntoIterator<Item = [String; N]>,
    numeric: &[usize],
) -> String {
    let mut builder = Builder::default();

    builder.push_record(header);

    for row in rows {
        builder.push_record(row);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());

    for &column in numeric {
        table.modify(Columns::new(column..=column), Alignment::right());
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_header_and_rows() {
        let output = render(
            ["Title", "Stock"],
            [["Demian".to_string(), "3".to_string()]],
            &[1],
        );

        assert!(output.contains("Title"));
        assert!(output.contains("Demian"));
        assert_eq!(output.lines().count(), 5);
    }
}
