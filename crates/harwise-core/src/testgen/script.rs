use super::case::{Assertion, TestCase};
use serde_json::Value;

/// Render a descriptor as a standalone Node.js test program.
///
/// The program exports `default async function(ctx)`, where `ctx` offers
/// `get(name)` and `set(name, value)`. It performs the same steps the
/// in-process runner performs for the descriptor.
pub fn render_script(case: &TestCase) -> String {
    let mut js = String::new();

    js.push_str("import { strict as assert } from 'node:assert';\n");
    js.push_str("import { fetch } from 'undici';\n");
    js.push_str("import { JSONPath } from 'jsonpath-plus';\n\n");
    js.push_str(&format!(
        "export default async function test_{}(ctx) {{\n",
        case.index
    ));
    js.push_str(&format!("  let url = {};\n", js_string(&case.request.url)));
    js.push_str("  const headers = {};\n");
    for (name, value) in &case.request.headers {
        js.push_str(&format!(
            "  headers[{}] = {};\n",
            js_string(name),
            js_string(value)
        ));
    }
    match &case.request.body {
        Some(body) => js.push_str(&format!("  let requestBody = {};\n", js_string(body))),
        None => js.push_str("  let requestBody = undefined;\n"),
    }

    if !case.substitutions.is_empty() {
        js.push_str("\n  // Apply variable substitutions\n");
        for sub in &case.substitutions {
            let pattern = js_string(&sub.pattern);
            js.push_str("  {\n");
            js.push_str(&format!("    const value = ctx.get({});\n", js_string(&sub.var)));
            js.push_str("    if (value) {\n");
            js.push_str(&format!(
                "      url = url.replace(new RegExp({}, 'g'), String(value));\n",
                pattern
            ));
            js.push_str("      if (requestBody) {\n");
            js.push_str(&format!(
                "        requestBody = requestBody.replace(new RegExp({}, 'g'), String(value));\n",
                pattern
            ));
            js.push_str("      }\n    }\n  }\n");
        }
    }

    js.push_str("\n  const startTime = Date.now();\n");
    js.push_str(&format!(
        "  const response = await fetch(url, {{ method: {}, headers, body: requestBody }});\n",
        js_string(&case.request.method)
    ));
    js.push_str("  const responseTime = Date.now() - startTime;\n");
    js.push_str("  const contentType = response.headers.get('content-type') || '';\n\n");

    let mut body_parsed = false;
    for assertion in &case.assertions {
        if assertion.needs_body() && !body_parsed {
            push_body_parse(&mut js);
            body_parsed = true;
        }
        push_assertion(&mut js, assertion);
    }
    if !body_parsed {
        push_body_parse(&mut js);
    }

    if !case.extractions.is_empty() {
        js.push_str("\n  // Extract variables\n");
        js.push_str("  if (responseData !== undefined) {\n");
        for extraction in &case.extractions {
            js.push_str("    {\n");
            js.push_str(&format!(
                "      const value = JSONPath({{ path: {}, json: responseData }})[0];\n",
                js_string(&extraction.from)
            ));
            js.push_str("      if (value !== undefined) {\n");
            js.push_str(&format!(
                "        ctx.set({}, value);\n",
                js_string(&extraction.to)
            ));
            js.push_str("      }\n    }\n");
        }
        js.push_str("  }\n");
    }

    js.push_str("}\n");
    js
}

fn push_body_parse(js: &mut String) {
    js.push_str("\n  const responseText = await response.text();\n");
    js.push_str("  let responseData;\n");
    js.push_str("  if (/[/+]json\\b/i.test(contentType)) {\n");
    js.push_str("    responseData = JSON.parse(responseText);\n");
    js.push_str("  }\n\n");
}

fn push_assertion(js: &mut String, assertion: &Assertion) {
    match assertion {
        Assertion::StatusRange { min, max } => {
            js.push_str(&format!(
                "  assert.ok(response.status >= {} && response.status < {}, `Unexpected status ${{response.status}}`);\n",
                min, max
            ));
        }
        Assertion::ContentType { contains } => {
            let expected = js_string(contains);
            js.push_str(&format!(
                "  assert.ok(contentType.includes({}), `Expected content-type to contain ${{{}}}, got ${{contentType}}`);\n",
                expected, expected
            ));
        }
        Assertion::MaxDuration { max_ms, sample_ms } => {
            js.push_str(&format!(
                "  assert.ok(responseTime <= {}, `Response time ${{responseTime}}ms exceeded limit of {}ms (sample: {}ms)`);\n",
                max_ms, max_ms, sample_ms
            ));
        }
        Assertion::JsonPathExists { path } => {
            let path = js_string(path);
            js.push_str(&format!(
                "  assert.ok(JSONPath({{ path: {}, json: responseData ?? null }}).length > 0, `${{{}}} should exist`);\n",
                path, path
            ));
        }
        Assertion::JsonPathMinLength { path, min } => {
            let path = js_string(path);
            js.push_str(&format!(
                "  assert.ok(JSONPath({{ path: {}, json: responseData ?? null }}).length >= {}, `${{{}}} should have at least {} items`);\n",
                path, min, path, min
            ));
        }
    }
}

/// Quote a string as a JavaScript string literal
fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}
