//! HTML extraction with an XPath selector.

use skyscraper::html;
use skyscraper::xpath::{
    self,
    grammar::{XpathItemTreeNode, XpathItemTreeNodeData},
    XpathItemTree,
};

use oracle_shared::{
    AttestationRequest, EncodingValue, HtmlResultType, OracleError, Result,
};

use super::{Extraction, build_request, check_status};

/// Fetch `req.url` and evaluate the XPath selector against its HTML body.
///
/// Unlike the JSON extractor, float values are re-rendered with rounding:
/// HTML sources tend to carry display formatting, so the value is parsed
/// and printed back at the requested precision.
pub async fn extract_html(client: &reqwest::Client, req: &AttestationRequest) -> Result<Extraction> {
    let response = build_request(client, req)?
        .send()
        .await
        .map_err(|e| OracleError::FetchingData {
            status: e.status().map(|s| s.as_u16()),
        })?;
    let status_code = response.status().as_u16();
    check_status(status_code)?;

    let body = response
        .text()
        .await
        .map_err(|_| OracleError::DecodingResponse)?;
    let mut value = select_html(&body, &req.selector, req.html_result()?)?;
    if req.encoding_value()? == EncodingValue::Float {
        value = format_float(&value, req.encoding_options.precision)?;
    }

    Ok(Extraction {
        response_body: body,
        value,
        status_code,
    })
}

/// Evaluate `selector` and render the first matched node, either as its
/// text content or re-serialized as HTML.
pub(crate) fn select_html(
    body: &str,
    selector: &str,
    result_type: HtmlResultType,
) -> Result<String> {
    let document = html::parse(body).map_err(|_| OracleError::ParsingHtmlContent)?;
    let tree = XpathItemTree::from(&document);
    let path =
        xpath::parse(selector).map_err(|_| OracleError::InvalidXpath(selector.to_string()))?;
    let matches = path
        .apply(&tree)
        .map_err(|_| OracleError::SelectorNotFound)?;
    let Some(item) = matches.into_iter().next() else {
        return Err(OracleError::SelectorNotFound);
    };
    let node = item
        .as_node()
        .map_err(|_| OracleError::SelectorNotFound)?
        .as_tree_node()
        .map_err(|_| OracleError::SelectorNotFound)?
        .clone();
    match result_type {
        HtmlResultType::Value => Ok(node.all_text(&tree)),
        HtmlResultType::Element => {
            let mut out = String::new();
            render_node(&tree, node, &mut out);
            Ok(out)
        }
    }
}

/// Parse an extracted float and print it back at the requested precision.
///
/// This rounds where the JSON extractor truncates: HTML values usually
/// carry display formatting, so they are normalized through `f64` instead
/// of being cut mid-digit.
pub(crate) fn format_float(value: &str, precision: u8) -> Result<String> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| OracleError::ParsingHtmlContent)?;
    Ok(format!(
        "{parsed:.precision$}",
        precision = usize::from(precision)
    ))
}

/// Re-serialize a node subtree. Attribute order is normalized so the
/// rendering is stable.
fn render_node(tree: &XpathItemTree, node: XpathItemTreeNode, out: &mut String) {
    match node.data {
        XpathItemTreeNodeData::ElementNode(element) => {
            out.push('<');
            out.push_str(&element.name);
            let mut attributes: Vec<_> = element.attributes.iter().map(|a| (&a.name, &a.value)).collect();
            attributes.sort();
            for (key, value) in attributes {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(value);
                out.push('"');
            }
            out.push('>');
            for child in node.children(tree) {
                render_node(tree, child, out);
            }
            out.push_str("</");
            out.push_str(&element.name);
            out.push('>');
        }
        XpathItemTreeNodeData::TextNode(text) => out.push_str(&text.content),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_text_extracts() {
        let body = "<html><head><title>Hello</title></head></html>";
        assert_eq!(
            select_html(body, "/html/head/title", HtmlResultType::Value).unwrap(),
            "Hello"
        );
    }

    #[test]
    fn only_the_first_match_is_returned() {
        let body = "<html><body><span>first</span><span>second</span></body></html>";
        let text = select_html(body, "//span", HtmlResultType::Value).unwrap();
        assert_eq!(text, "first");
    }

    #[test]
    fn missing_nodes_are_selector_not_found() {
        let body = "<html><body><p>x</p></body></html>";
        assert!(matches!(
            select_html(body, "/html/head/title", HtmlResultType::Value),
            Err(OracleError::SelectorNotFound)
        ));
    }

    #[test]
    fn element_result_reserializes_the_subtree() {
        let body = r#"<html><body><div class="price"><b>42</b></div></body></html>"#;
        let element = select_html(body, "//div", HtmlResultType::Element).unwrap();
        assert_eq!(element, r#"<div class="price"><b>42</b></div>"#);
    }

    #[test]
    fn float_values_are_rounded_not_truncated() {
        // the JSON path truncates the same input to "12345.67"
        assert_eq!(format_float("12345.6789", 2).unwrap(), "12345.68");
        assert_eq!(
            crate::extract::truncate_decimals("12345.6789", 2),
            "12345.67"
        );
        assert_eq!(format_float(" 42 ", 3).unwrap(), "42.000");
        assert!(matches!(
            format_float("not a number", 2),
            Err(OracleError::ParsingHtmlContent)
        ));
    }

    #[test]
    fn bad_xpath_is_rejected_up_front() {
        let body = "<html><body></body></html>";
        assert!(matches!(
            select_html(body, "///", HtmlResultType::Value),
            Err(OracleError::InvalidXpath(_) | OracleError::SelectorNotFound)
        ));
    }
}
