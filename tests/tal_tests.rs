mod common;

use common::{NAMESPACES, TestResult, init_logging, render_body, render_inner};
use serde_json::json;
use zpt::{CancellationFlag, RenderError, Renderer, TalesError, Value};

#[test]
fn repeat_clones_once_per_item_with_repetition_info() -> TestResult {
    let out = render_inner(
        r#"<p tal:repeat="x here/items" tal:content="string:${x} ${repeat/x/index} ${repeat/x/even}"/>"#,
        json!({"items": ["A", "B"]}),
    )?;
    assert_eq!(out, "<p>A 0 true</p><p>B 1 false</p>");
    Ok(())
}

#[test]
fn repeat_over_nothing_removes_the_element() -> TestResult {
    let out = render_inner(
        r#"<p tal:repeat="x here/missing | nothing">x</p><i/>"#,
        json!({}),
    )?;
    assert_eq!(out, "<i/>");
    Ok(())
}

#[test]
fn nested_repeats_see_both_loops() -> TestResult {
    let out = render_inner(
        r#"<ul tal:repeat="row here/rows"><li tal:repeat="cell row" tal:content="string:${repeat/row/number}.${repeat/cell/letter}=${cell}"/></ul>"#,
        json!({"rows": [["x", "y"], ["z"]]}),
    )?;
    assert_eq!(
        out,
        "<ul><li>1.a=x</li><li>1.b=y</li></ul><ul><li>2.a=z</li></ul>"
    );
    Ok(())
}

#[test]
fn local_definitions_stay_in_their_subtree_and_globals_do_not() -> TestResult {
    let out = render_inner(
        r#"<p tal:define="local a string:A; global b string:B"><b tal:content="a"/></p><i tal:content="b"/><s tal:content="a | nothing"/>"#,
        json!({}),
    )?;
    assert_eq!(out, "<p><b>A</b></p><i>B</i><s/>");
    Ok(())
}

#[test]
fn later_clauses_see_earlier_definitions() -> TestResult {
    let out = render_inner(
        r#"<p tal:define="user here/user; name user/name" tal:content="name"/>"#,
        json!({"user": {"name": "Ada"}}),
    )?;
    assert_eq!(out, "<p>Ada</p>");
    Ok(())
}

#[test]
fn escaped_semicolons_survive_clause_splitting() -> TestResult {
    let out = render_inner(
        r#"<p tal:define="text string:a;;b" tal:content="text"/>"#,
        json!({}),
    )?;
    assert_eq!(out, "<p>a;b</p>");
    Ok(())
}

#[test]
fn condition_uses_truthiness() -> TestResult {
    let out = render_inner(
        r#"<a tal:condition="here/empty">1</a><b tal:condition="here/zero">2</b><c tal:condition="here/no">3</c><d tal:condition="nothing">4</d><e tal:condition="here/text">5</e><f tal:condition="here/one">6</f><g tal:condition="default">7</g><h tal:condition="not:here/no">8</h>"#,
        json!({"empty": "", "zero": 0, "no": false, "text": "x", "one": 1}),
    )?;
    assert_eq!(out, "<e>5</e><f>6</f><g>7</g><h>8</h>");
    Ok(())
}

#[test]
fn attributes_are_rewritten_after_content() -> TestResult {
    let out = render_inner(
        r##"<a href="#" tal:attributes="href string:/users/${here/id}; title here/name" tal:content="here/name"/>"##,
        json!({"id": 7, "name": "Ada"}),
    )?;
    assert_eq!(out, r#"<a href="/users/7" title="Ada">Ada</a>"#);
    Ok(())
}

#[test]
fn omit_tag_and_repeat_splice_in_order() -> TestResult {
    let out = render_inner(
        r#"<tal:item tal:repeat="x here/xs"><b tal:content="x"/></tal:item>"#,
        json!({"xs": [1, 2, 3]}),
    )?;
    assert_eq!(out, "<b>1</b><b>2</b><b>3</b>");
    Ok(())
}

#[test]
fn on_error_contains_failures_to_its_subtree() -> TestResult {
    let out = render_inner(
        r#"<section tal:on-error="string:Error!"><p tal:content="here/missing/deep"/></section><p tal:content="here/ok"/>"#,
        json!({"ok": "fine"}),
    )?;
    assert_eq!(out, "<section>Error!</section><p>fine</p>");
    Ok(())
}

#[test]
fn unhandled_errors_keep_their_cause() {
    let err = render_body(r#"<p tal:content="here/a | here/b"/>"#, json!({})).unwrap_err();
    match err {
        RenderError::Evaluation { source, .. } => {
            assert!(matches!(source, TalesError::AllAlternatesFailed { ref causes, .. } if causes.len() == 2));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn documents_without_tal_round_trip() -> TestResult {
    init_logging();
    let markup = r#"<html lang="en"><head><title>T &amp; U</title></head><body><p class="x">Hello <b>world</b></p><!-- note --></body></html>"#;
    assert_eq!(zpt::render_str(markup, &json!({}))?, markup);
    Ok(())
}

#[test]
fn doctype_and_cdata_survive_rendering() -> TestResult {
    init_logging();
    let markup = "<!DOCTYPE html>\n<html><!-- c --><?pi x?><p a=\"1\">t&amp;<![CDATA[x<y]]></p></html>";
    assert_eq!(zpt::render_str(markup, &json!({}))?, markup);
    Ok(())
}

#[test]
fn cancellation_is_not_handled_by_on_error() -> TestResult {
    init_logging();
    let renderer = Renderer::default();
    let template = renderer.parse_template(
        &format!(r#"<div {NAMESPACES} tal:on-error="string:caught"><p/></div>"#),
        None,
    )?;
    let flag = CancellationFlag::new();
    flag.cancel();
    let err = renderer
        .render(&template, &Value::Null, Some(flag))
        .unwrap_err();
    assert!(err.is_cancelled());
    Ok(())
}
