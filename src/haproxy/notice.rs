/// Pull the human-readable notice out of an admin response page.
///
/// HAProxy renders the result of an admin action in the first `<div>` of the
/// page, followed by a `[X]` close link.
pub fn extract_notice(body: &str) -> Option<String> {
    let lower = body.to_ascii_lowercase();
    let open = lower.find("<div")?;
    let content_start = open + lower[open..].find('>')? + 1;
    let content_end = lower[content_start..]
        .find("</div")
        .map(|end| content_start + end)
        .unwrap_or(body.len());

    let text = strip_tags(&body[content_start..content_end])
        .replace("[X]", "")
        .replace('.', "");
    let notice = text.split_whitespace().collect::<Vec<_>>().join(" ");

    (!notice.is_empty()).then_some(notice)
}

fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text
}
