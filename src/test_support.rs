//! HTML fixtures shaped like the live directory page.

pub fn data_row(partner: &str, city: &str, state: &str, show_pin: Option<&str>) -> String {
    let button = show_pin
        .map(|call| {
            format!(
                "<button type=\"button\" onclick='{}' style=\"border:none\"></button>",
                call
            )
        })
        .unwrap_or_default();

    let mut cells = vec![
        format!("<td>{}</td>", button),
        format!("<td>{}</td>", partner),
        "<td>Army</td>".to_string(),
        format!("<td>{}</td>", city),
        format!("<td>{}</td>", state),
    ];
    cells.extend((5..19).map(|i| format!("<td>d{}</td>", i)));

    format!("<tr>{}</tr>", cells.concat())
}

pub fn subheader_row(partner: &str) -> String {
    format!("<tr><td></td><td colspan=\"18\">{}</td><td></td></tr>", partner)
}

pub fn directory_page(rows: &[String], info: &str, next_disabled: bool) -> String {
    let next_class = if next_disabled {
        "paginate_button next disabled"
    } else {
        "paginate_button next"
    };

    format!(
        r#"<html><body>
<input id="keywords" type="text">
<table id="location-table"><thead><tr><th></th><th>Partner/Program</th></tr></thead>
<tbody>{}</tbody></table>
<div class="dataTables_info">{}</div>
<a class="{}" id="location-table_next">Next</a>
</body></html>"#,
        rows.concat(),
        info,
        next_class
    )
}

/// Rows numbered `first..first + count`, each with a full geocode.
pub fn numbered_rows(first: usize, count: usize) -> Vec<String> {
    (first..first + count)
        .map(|n| {
            data_row(
                &format!("Partner {}", n),
                "Norfolk",
                "VA",
                Some(&format!(r#"ShowPin({}.0,-76.0,"Norfolk","VA","23511")"#, n)),
            )
        })
        .collect()
}
