use super::*;

#[test]
fn prefers_main_over_body() {
    let html = r#"
        <html>
            <body>
                <nav>Home | Docs</nav>
                <main>
                    <h1>What is Amazon VPC?</h1>
                    <p>With Amazon VPC you can launch resources in a logically isolated network.</p>
                </main>
                <footer>Copyright</footer>
            </body>
        </html>
    "#;

    let text = extract_text(html);
    assert_eq!(
        text,
        "What is Amazon VPC?\nWith Amazon VPC you can launch resources in a logically isolated network."
    );
}

#[test]
fn falls_back_to_body() {
    let html = "<html><body><h1>Title</h1><div><p>First</p><p>  Second  </p></div></body></html>";
    assert_eq!(extract_text(html), "Title\nFirst\nSecond");
}

#[test]
fn drops_script_and_style() {
    let html = r#"
        <html>
            <head><style>body { color: red; }</style></head>
            <body>
                <script>var tracking = true;</script>
                <p>Visible <b>bold</b> text</p>
                <style>.hidden { display: none; }</style>
            </body>
        </html>
    "#;

    assert_eq!(extract_text(html), "Visible\nbold\ntext");
}

#[test]
fn first_main_only() {
    let html = "<body><main><p>one</p></main><main><p>two</p></main></body>";
    assert_eq!(extract_text(html), "one");
}

#[test]
fn empty_and_malformed_html() {
    assert_eq!(extract_text(""), "");
    assert_eq!(extract_text("<body><p>   </p></body>"), "");
    assert_eq!(extract_text("<body><p>unclosed <div>tags"), "unclosed\ntags");
}
