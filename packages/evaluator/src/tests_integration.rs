/// Integration tests: document -> validate -> mount -> render -> dispatch
use crate::*;
use serde_json::json;

fn todo_app() -> serde_json::Value {
    json!({
        "id": "todos",
        "name": "TodoList",
        "props": { "title": "My tasks" },
        "data": {
            "heading": "${props.title} (${states.items.length})"
        },
        "states": {
            "items": [
                { "id": "t1", "text": "Write tests", "done": false },
                { "id": "t2", "text": "Ship", "done": true }
            ],
            "draft": "",
            "visibility": "all"
        },
        "methods": {
            "setDraft": { "fn": "(value) => setState('draft', value)" },
            "add": {
                "fn": "function add() { if (!draft.trim()) return; const id = 't' + (items.length + 1); setState({ items: [...items, { id, text: draft.trim(), done: false }], draft: '' }); }"
            },
            "toggle": {
                "fn": "(id) => setState('items', items.map(item => item.id === id ? { ...item, done: !item.done } : item))"
            },
            "remaining": { "fn": "() => items.filter(item => !item.done).length" },
            "showOpen": { "fn": "() => setState('visibility', 'open')" }
        },
        "effects": [
            { "fn": "() => { console.log('mounted', items.length) }", "deps": [] }
        ],
        "render": {
            "id": "root",
            "type": "section",
            "children": [
                { "id": "heading", "type": "h1", "children": { "$bind": "heading" } },
                { "id": "draft", "type": "input", "props": { "value": { "$bind": "draft" }, "onChange": "setDraft" } },
                { "id": "add", "type": "button", "props": { "onClick": "add" }, "children": "Add" },
                { "id": "open-only", "type": "button", "props": { "onClick": "showOpen" } },
                {
                    "id": "list",
                    "type": "ul",
                    "children": {
                        "id": "todo",
                        "type": "li",
                        "for": {
                            "in": { "$exp": "visibility === 'all' ? items : items.filter(i => !i.done)" },
                            "as": "item",
                            "key": "item.id"
                        },
                        "props": {
                            "className": { "$exp": "item.done ? 'done' : 'open'" },
                            "onClick": "toggle"
                        },
                        "children": { "$bind": "item.text" }
                    }
                },
                {
                    "id": "empty",
                    "type": "p",
                    "if": { "$exp": "items.length === 0" },
                    "else": { "id": "count", "type": "p", "children": "{{ items.filter(i => !i.done).length }} left" }
                }
            ]
        }
    })
}

fn keys(doc: &VirtualDomDocument) -> Vec<String> {
    doc.find_target("list")
        .map(|list| list.children().iter().filter_map(VNode::key).map(str::to_string).collect())
        .unwrap_or_default()
}

#[test]
fn test_todo_app_document_is_clean() {
    let warnings = DocumentValidator::new().validate(&todo_app());
    let errors: Vec<_> = warnings.iter().filter(|w| w.is_error()).collect();
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
}

#[test]
fn test_todo_app_initial_render() {
    let mounted = Runtime::default().mount_json(&todo_app(), ObjectMap::new()).unwrap();
    assert!(mounted.effects().is_clean());
    assert_eq!(mounted.effects().executed, 1);

    let doc = mounted.render();
    assert_eq!(doc.find_target("heading").map(VNode::text_content), Some("My tasks (2)".to_string()));
    assert_eq!(keys(&doc), vec!["t1", "t2"]);
    assert_eq!(doc.find_target("t2").and_then(|li| li.attr("className")), Some(&Value::string("done")));
    assert_eq!(doc.find_target("count").map(VNode::text_content), Some("1 left".to_string()));
    assert!(doc.find_target("empty").is_none());
}

#[test]
fn test_todo_app_interactions() {
    let mounted = Runtime::default().mount_json(&todo_app(), ObjectMap::new()).unwrap();
    mounted.render();

    // Empty drafts are ignored
    mounted.dispatch("add", "onClick", &[]).unwrap();
    assert_eq!(keys(&mounted.last_render()), vec!["t1", "t2"]);

    mounted.dispatch("draft", "onChange", &[Value::string("  Review  ")]).unwrap();
    assert_eq!(
        mounted.last_render().find_target("draft").and_then(|input| input.attr("value").cloned()),
        Some(Value::string("  Review  "))
    );
    mounted.dispatch("add", "onClick", &[]).unwrap();

    let doc = mounted.last_render();
    assert_eq!(keys(&doc), vec!["t1", "t2", "t3"]);
    assert_eq!(doc.find_target("t3").map(VNode::text_content), Some("Review".to_string()));
    assert_eq!(mounted.state().get("draft"), Some(&Value::string("")));
    assert_eq!(doc.find_target("heading").map(VNode::text_content), Some("My tasks (3)".to_string()));

    mounted.dispatch("t1", "onClick", &[Value::string("t1")]).unwrap();
    assert_eq!(mounted.trigger("remaining", &[]).unwrap(), Value::Number(1.0));

    mounted.dispatch("open-only", "onClick", &[]).unwrap();
    assert_eq!(keys(&mounted.last_render()), vec!["t3"]);
}

#[test]
fn test_state_is_fresh_across_calls() {
    let mounted = Runtime::default()
        .mount_json(
            &json!({
                "id": "c",
                "states": { "count": 0 },
                "methods": {
                    "increment": { "fn": "() => setState('count', count + 1)" },
                    "incrementTwice": { "fn": "() => { increment(); increment(); }" }
                },
                "render": { "id": "root", "type": "span", "children": { "$bind": "count" } }
            }),
            ObjectMap::new(),
        )
        .unwrap();

    mounted.trigger("increment", &[]).unwrap();
    mounted.trigger("increment", &[]).unwrap();
    assert_eq!(mounted.state().get("count"), Some(&Value::Number(2.0)));

    // Each sibling call reads the state as of that call
    mounted.trigger("incrementTwice", &[]).unwrap();
    assert_eq!(mounted.state().get("count"), Some(&Value::Number(4.0)));
    assert_eq!(mounted.render().text_content(), "4");
}

#[test]
fn test_rendered_keys_have_no_duplicates() {
    let mounted = Runtime::default().mount_json(&todo_app(), ObjectMap::new()).unwrap();
    let doc = mounted.render();
    assert!(DocumentValidator::new().check_rendered_keys(&doc.nodes).is_empty());
}

#[test]
fn test_virtual_dom_serializes() {
    let doc = Runtime::new(RenderOptions { animations: false, ..RenderOptions::default() })
        .mount_json(
            &json!({
                "id": "c",
                "render": { "id": "root", "type": "p", "props": { "className": "note" }, "children": "hi" }
            }),
            ObjectMap::new(),
        )
        .unwrap()
        .render();
    let json = serde_json::to_value(&doc).unwrap();
    assert_eq!(
        json,
        json!({
            "nodes": [{
                "type": "element",
                "tag": "p",
                "id": "root",
                "attributes": { "className": "note" },
                "children": [{ "type": "text", "content": "hi" }]
            }]
        })
    );
}
