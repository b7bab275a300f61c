use serde_json::{json, Value};

use crate::ast::Verb;
use crate::coerce::{coerce, unquote, CoercedValue};
use crate::error::{CommandError, SkipReason};
use crate::interpreter::{CommandStatus, Interpreter, Outcome};
use crate::parser::{extract, extract_with_diagnostics};
use crate::splitter::{split_balanced, split_params};
use crate::tree::{self, Path};

// ── Shared fixture runner ──────────────────────────────────────────

/// Embed fixture files at compile time.
const APPLY_FIXTURES: &str = include_str!("../test-data/fixtures/apply.json");

#[test]
fn test_fixture_apply() {
    let fixtures: Vec<Value> = serde_json::from_str(APPLY_FIXTURES).unwrap();
    assert!(!fixtures.is_empty());

    for fixture in &fixtures {
        let name = fixture["name"].as_str().unwrap();
        let state = &fixture["state"];
        let script = fixture["script"].as_str().unwrap();
        let interpreter = match fixture.get("root").and_then(Value::as_str) {
            Some(root) => Interpreter::with_root(root),
            None => Interpreter::default(),
        };
        let expect_no_change = fixture
            .get("expectNoChange")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let outcome = interpreter.apply(script, state);

        if expect_no_change {
            assert_eq!(
                outcome,
                Outcome::NoChange,
                "Fixture '{}': expected no change",
                name
            );
            continue;
        }
        let expected = &fixture["expected"];
        match outcome {
            Outcome::Changed(value) => assert_eq!(
                &value, expected,
                "Fixture '{}': value mismatch\n  Got:      {}\n  Expected: {}",
                name, value, expected
            ),
            Outcome::NoChange => panic!("Fixture '{}': expected a change, got none", name),
        }
    }
}

// ── Parameter splitting ────────────────────────────────────────────

#[test]
fn test_split_simple_arguments() {
    assert_eq!(split_params("'a', 1"), vec!["'a'", "1"]);
    assert_eq!(split_params("  'hp' ,  -3  "), vec!["'hp'", "-3"]);
}

#[test]
fn test_split_empty_body() {
    assert!(split_params("").is_empty());
    assert!(split_params("   ").is_empty());
}

#[test]
fn test_split_respects_quotes_and_groups() {
    assert_eq!(
        split_params(r#"'msg', "Hello, (world)!""#),
        vec!["'msg'", r#""Hello, (world)!""#]
    );
    assert_eq!(
        split_params("'a', [1, 2], {x: 1, y: [3, 4]}, f(5, 6)"),
        vec!["'a'", "[1, 2]", "{x: 1, y: [3, 4]}", "f(5, 6)"]
    );
}

#[test]
fn test_split_escaped_quote_does_not_close() {
    assert_eq!(
        split_params(r#"'a', "say \"hi, there\"", 3"#),
        vec!["'a'", r#""say \"hi, there\"""#, "3"]
    );
    assert_eq!(split_params(r"'it\'s, fine', 2"), vec![r"'it\'s, fine'", "2"]);
}

#[test]
fn test_split_other_quote_kinds_are_plain_inside_a_string() {
    assert_eq!(split_params(r#""it's, ok", 1"#), vec![r#""it's, ok""#, "1"]);
}

#[test]
fn test_split_keeps_empty_middle_argument() {
    assert_eq!(split_params("a,,b"), vec!["a", "", "b"]);
    assert_eq!(split_params("a,"), vec!["a"]);
}

#[test]
fn test_split_balanced_rejects_open_groups() {
    assert_eq!(split_balanced("'a', {foo: 1"), None);
    assert_eq!(split_balanced("'a', \"open"), None);
    assert_eq!(
        split_balanced("'a', {foo: 1}"),
        Some(vec!["'a'".to_string(), "{foo: 1}".to_string()])
    );
}

// ── Command extraction ─────────────────────────────────────────────

#[test]
fn test_extract_all_verbs_in_order() {
    let text = "_.set('a', 1);\n_.add('b', 2);\n_.remove('c');\n_.assign('d', 'x');\n_.insert('e', 0, 'y');";
    let commands = extract(text);
    let verbs: Vec<Verb> = commands.iter().map(|c| c.verb).collect();
    assert_eq!(
        verbs,
        vec![Verb::Set, Verb::Add, Verb::Remove, Verb::Assign, Verb::Insert]
    );
    assert_eq!(commands[4].raw_args, vec!["'e'", "0", "'y'"]);
}

#[test]
fn test_extract_quote_aware() {
    let commands = extract(r#"_.set('msg', "Hello, (world)!");"#);
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].verb, Verb::Set);
    assert_eq!(commands[0].raw_args, vec!["'msg'", r#""Hello, (world)!""#]);
}

#[test]
fn test_extract_any_quote_toggles_the_string_state() {
    // The apostrophe closes the string opened by `"`, so the final `)`
    // lands inside a new string and the call never terminates.
    let extraction = extract_with_diagnostics(r#"_.set('note', "it's (mostly) fine");"#);
    assert!(extraction.commands.is_empty());
    assert_eq!(extraction.skipped.len(), 1);
    assert_eq!(extraction.skipped[0].reason, SkipReason::Unterminated);

    let commands = extract(r#"_.set('note', "it\'s fine");"#);
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].raw_args[1], r#""it\'s fine""#);
}

#[test]
fn test_extract_missing_semicolon() {
    assert!(extract("_.set('a', 1)").is_empty());
    assert!(extract("_.set('a', 1) ;").is_empty());

    let extraction = extract_with_diagnostics("_.set('a', 1)\n_.set('b', 2);");
    assert_eq!(extraction.commands.len(), 1);
    assert_eq!(extraction.commands[0].raw_args, vec!["'b'", "2"]);
    assert_eq!(extraction.skipped.len(), 1);
    assert_eq!(extraction.skipped[0].reason, SkipReason::MissingSemicolon);
}

#[test]
fn test_extract_mismatched_brace() {
    let extraction = extract_with_diagnostics("_.set('a', {foo: 1);");
    assert!(extraction.commands.is_empty());
    assert_eq!(extraction.skipped[0].reason, SkipReason::Unbalanced);
}

#[test]
fn test_extract_unterminated_resumes_inside_call() {
    let extraction = extract_with_diagnostics("_.set('a', (_.set('b', 2);");
    assert_eq!(extraction.commands.len(), 1);
    assert_eq!(extraction.commands[0].raw_args, vec!["'b'", "2"]);
    assert_eq!(extraction.skipped.len(), 1);
    assert_eq!(extraction.skipped[0].reason, SkipReason::Unterminated);
    assert_eq!(extraction.skipped[0].begin.offset, 0);
}

#[test]
fn test_extract_skipped_position() {
    let extraction = extract_with_diagnostics("prose\n  _.add('x', 1)");
    let begin = extraction.skipped[0].begin;
    assert_eq!(begin.line, 1);
    assert_eq!(begin.column, 2);
    assert_eq!(begin.offset, 8);
}

#[test]
fn test_extract_ignores_unknown_verbs_and_prose() {
    let text = "The party rests. _.push('a', 1); _.sets('b', 2); _.update('c');";
    assert!(extract(text).is_empty());
}

#[test]
fn test_extract_no_space_between_calls() {
    let commands = extract("_.set('a',1);_.set('b',2);");
    assert_eq!(commands.len(), 2);
}

// ── Value coercion ─────────────────────────────────────────────────

#[test]
fn test_coerce_keywords() {
    assert_eq!(coerce(" true "), CoercedValue::Boolean(true));
    assert_eq!(coerce("false"), CoercedValue::Boolean(false));
    assert_eq!(coerce("null"), CoercedValue::Null);
    assert_eq!(coerce("undefined"), CoercedValue::Undefined);
    assert_eq!(coerce("True"), CoercedValue::String("True".to_string()));
}

#[test]
fn test_coerce_strict_json() {
    assert_eq!(coerce("42"), CoercedValue::Number(42.into()));
    assert_eq!(coerce("\"a\\nb\""), CoercedValue::String("a\nb".to_string()));
    assert_eq!(
        coerce(r#"{"a": [1, {"b": null}]}"#),
        CoercedValue::from(json!({"a": [1, {"b": null}]}))
    );
}

#[test]
fn test_coerce_round_trip() {
    let samples = vec![
        json!("text"),
        json!(-12),
        json!(3.25),
        json!(true),
        json!(null),
        json!({"name": "Ann", "tags": ["a", "b"], "nested": {"depth": [1, [2, 3]]}}),
        json!([{"x": 1}, [], {}]),
    ];
    for sample in samples {
        let text = serde_json::to_string(&sample).unwrap();
        let coerced = coerce(&text).into_json();
        let reparsed: Value = serde_json::from_str(&serde_json::to_string(&coerced).unwrap()).unwrap();
        assert_eq!(coerced, reparsed);
        assert_eq!(coerced, sample);
    }
}

#[test]
fn test_coerce_relaxed_literals() {
    assert_eq!(
        coerce("{name: 'Bob', 'age': 30, list: [1, 2,],}"),
        CoercedValue::from(json!({"name": "Bob", "age": 30, "list": [1, 2]}))
    );
    assert_eq!(
        coerce("['a', `b`, undefined]"),
        CoercedValue::from(json!(["a", "b", null]))
    );
    assert_eq!(
        coerce("{a: undefined, b: +1.5, c: .5}"),
        CoercedValue::from(json!({"b": 1.5, "c": 0.5}))
    );
}

#[test]
fn test_coerce_relaxed_rejects_expressions() {
    assert_eq!(
        coerce("{a: foo()}"),
        CoercedValue::String("{a: foo()}".to_string())
    );
    assert_eq!(
        coerce("[1 + 2]"),
        CoercedValue::String("[1 + 2]".to_string())
    );
}

#[test]
fn test_coerce_deep_nesting_falls_back_to_text() {
    let deep = format!("{}{}", "[".repeat(200_000), "]".repeat(200_000));
    assert_eq!(coerce(&deep), CoercedValue::String(deep.clone()));

    let relaxed_deep = format!("{}1,{}", "[".repeat(200), "]".repeat(200));
    assert!(crate::relaxed::parse(&relaxed_deep).is_err());

    let shallow = format!("{}'x',{}", "[".repeat(100), "]".repeat(100));
    assert!(matches!(coerce(&shallow), CoercedValue::Array(_)));
}

#[test]
fn test_apply_deeply_nested_literal_is_stored_as_text() {
    let deep = format!("{}{}", "{a:".repeat(5_000), "}".repeat(5_000));
    let script = format!("_.set('x', {});", deep);
    let value = crate::apply(&script, &json!({})).into_value().unwrap();
    assert_eq!(value["statData"]["x"], json!(deep));
}

#[test]
fn test_coerce_out_of_range_number_is_text() {
    assert_eq!(coerce("1e400"), CoercedValue::String("1e400".to_string()));
    assert_eq!(coerce("-1e400"), CoercedValue::String("-1e400".to_string()));
}

#[test]
fn test_coerce_fallback_unquotes() {
    assert_eq!(coerce("'hello'"), CoercedValue::String("hello".to_string()));
    assert_eq!(coerce("`tick`"), CoercedValue::String("tick".to_string()));
    assert_eq!(coerce("  bare words "), CoercedValue::String("bare words".to_string()));
    assert_eq!(coerce("'mismatched\""), CoercedValue::String("'mismatched\"".to_string()));
}

#[test]
fn test_unquote_one_layer() {
    assert_eq!(unquote(" \"'x'\" "), "'x'");
    assert_eq!(unquote("'"), "'");
    assert_eq!(unquote("''"), "");
}

#[test]
fn test_key_string() {
    assert_eq!(coerce("1").to_key_string(), "1");
    assert_eq!(coerce("1.0").to_key_string(), "1");
    assert_eq!(coerce("true").to_key_string(), "true");
    assert_eq!(coerce("[1, 'a']").to_key_string(), "1,a");
}

// ── Paths and tree access ──────────────────────────────────────────

#[test]
fn test_path_segments() {
    let path = Path::parse("a.b[0]['c.d'][\"e\"]").unwrap();
    assert_eq!(path.segments(), ["a", "b", "0", "c.d", "e"]);
    assert!(Path::parse("").is_err());
    assert!(Path::parse("..").is_err());
}

#[test]
fn test_tree_get_and_set() {
    let mut root = json!({"a": {"list": [1, 2]}});
    let path = Path::parse("a.list[1]").unwrap();
    assert_eq!(tree::get(&root, &path), Some(&json!(2)));
    assert_eq!(tree::get(&root, &Path::parse("a.list[5]").unwrap()), None);
    assert_eq!(tree::get(&root, &Path::parse("a.list.x").unwrap()), None);

    tree::set(&mut root, &Path::parse("a.list[3]").unwrap(), json!("x")).unwrap();
    assert_eq!(root, json!({"a": {"list": [1, 2, null, "x"]}}));

    tree::set(&mut root, &Path::parse("n.0.k").unwrap(), json!(true)).unwrap();
    assert_eq!(root["n"], json!([{"k": true}]));
}

#[test]
fn test_tree_set_replaces_primitive_in_the_way() {
    let mut root = json!({"a": 5});
    tree::set(&mut root, &Path::parse("a.b").unwrap(), json!(1)).unwrap();
    assert_eq!(root, json!({"a": {"b": 1}}));
}

#[test]
fn test_tree_set_rejects_named_key_in_array() {
    let mut root = json!({"a": []});
    let err = tree::set(&mut root, &Path::parse("a.name").unwrap(), json!(1)).unwrap_err();
    assert!(matches!(err, CommandError::PathConflict { .. }));
}

#[test]
fn test_tree_set_rejects_overflowing_index() {
    let mut root = json!({"l": []});
    let path = Path::parse(&format!("l[{}]", usize::MAX)).unwrap();
    let err = tree::set(&mut root, &path, json!(1)).unwrap_err();
    assert_eq!(
        err,
        CommandError::IndexOutOfRange {
            path: path.as_str().to_string(),
            index: usize::MAX
        }
    );
    assert_eq!(root, json!({"l": []}));
}

#[test]
fn test_tree_set_limits_padding() {
    let mut root = json!({"l": [0]});
    let far = Path::parse("l[10000000000]").unwrap();
    assert!(matches!(
        tree::set(&mut root, &far, json!(1)),
        Err(CommandError::IndexOutOfRange { index: 10000000000, .. })
    ));

    let edge = Path::parse(&format!("l[{}]", tree::MAX_ARRAY_GAP)).unwrap();
    tree::set(&mut root, &edge, json!("end")).unwrap();
    let items = root["l"].as_array().unwrap();
    assert_eq!(items.len(), tree::MAX_ARRAY_GAP + 1);
    assert_eq!(items[tree::MAX_ARRAY_GAP], json!("end"));

    let mut fresh = json!({});
    let past_limit = Path::parse(&format!("n[{}]", tree::MAX_ARRAY_GAP)).unwrap();
    assert!(tree::set(&mut fresh, &past_limit, json!(1)).is_err());
}

#[test]
fn test_apply_oversized_index_does_not_abort() {
    let state = json!({"statData": {"l": []}});
    let script = "_.set('l[18446744073709551615]', 1); _.set('l[10000000000]', 2);";
    let (outcome, reports) = Interpreter::default().apply_with_report(script, &state);
    assert_eq!(outcome, Outcome::NoChange);
    assert!(reports
        .iter()
        .all(|r| matches!(r.status, CommandStatus::Failed(CommandError::IndexOutOfRange { .. }))));
}

#[test]
fn test_tree_unset() {
    let mut root = json!({"a": {"b": 1, "c": 2}, "l": [1, 2, 3]});
    assert!(tree::unset(&mut root, &Path::parse("a.b").unwrap()));
    assert!(!tree::unset(&mut root, &Path::parse("a.zzz").unwrap()));
    assert!(!tree::unset(&mut root, &Path::parse("q.r").unwrap()));
    assert!(tree::unset(&mut root, &Path::parse("l[1]").unwrap()));
    assert_eq!(root, json!({"a": {"c": 2}, "l": [1, null, 3]}));
}

#[test]
fn test_is_tuple() {
    assert!(tree::is_tuple(&json!([["x"], "desc"])));
    assert!(tree::is_tuple(&json!([[], ""])));
    assert!(!tree::is_tuple(&json!([["x"], "desc", 1])));
    assert!(!tree::is_tuple(&json!(["x", "desc"])));
    assert!(!tree::is_tuple(&json!([["x"], 3])));
    assert!(!tree::is_tuple(&json!({"0": [], "1": "d"})));
}

// ── Interpreter ────────────────────────────────────────────────────

#[test]
fn test_apply_end_to_end() {
    let state = json!({"statData": {"level": 1, "legacyField": "x"}});
    let script = "_.set('level', 5);\n_.remove('legacyField');";
    let outcome = crate::apply(script, &state);
    assert_eq!(outcome, Outcome::Changed(json!({"statData": {"level": 5}})));
}

#[test]
fn test_apply_leaves_input_untouched() {
    let state = json!({"statData": {"hp": 10, "bag": [["rope"], "Bag"]}});
    let before = state.clone();
    let outcome = crate::apply("_.add('hp', -3); _.assign('bag', 'lamp');", &state);
    assert!(outcome.is_changed());
    assert_eq!(state, before);
}

#[test]
fn test_apply_add_twice() {
    let state = json!({"statData": {"x": 0}});
    let outcome = crate::apply("_.add('x', 5);\n_.add('x', 5);", &state);
    assert_eq!(outcome.into_value().unwrap()["statData"]["x"], json!(10));
}

#[test]
fn test_apply_add_mixes_integers_and_floats() {
    let state = json!({"statData": {"x": 1}});
    let outcome = crate::apply("_.add('x', 0.5);", &state);
    assert_eq!(outcome.into_value().unwrap()["statData"]["x"], json!(1.5));
}

#[test]
fn test_apply_add_missing_path_is_no_change() {
    let state = json!({"statData": {}});
    assert_eq!(crate::apply("_.add('x', 1);", &state), Outcome::NoChange);
}

#[test]
fn test_apply_remove_missing_path_still_changes() {
    let state = json!({"statData": {"a": 1}});
    let outcome = crate::apply("_.remove('nothing.here');", &state);
    assert_eq!(outcome, Outcome::Changed(state.clone()));
}

#[test]
fn test_apply_malformed_only_is_no_change() {
    let state = json!({"statData": {"a": 0}});
    assert_eq!(crate::apply("_.set('a', {foo: 1);", &state), Outcome::NoChange);
    assert_eq!(crate::apply("_.set('a', 1)", &state), Outcome::NoChange);
    assert_eq!(crate::apply("", &state), Outcome::NoChange);
}

#[test]
fn test_apply_tuple_preserved() {
    let state = json!({"statData": {"a": [["x"], "desc"]}});
    let outcome = crate::apply("_.assign('a', 'y');", &state);
    assert_eq!(
        outcome,
        Outcome::Changed(json!({"statData": {"a": [["x", "y"], "desc"]}}))
    );
}

#[test]
fn test_apply_three_argument_insert_clamps_index() {
    let state = json!({"statData": {"l": ["a", "b"]}});
    let outcome = crate::apply("_.insert('l', 99, 'z'); _.insert('l', -1, 'y');", &state);
    assert_eq!(
        outcome.into_value().unwrap()["statData"]["l"],
        json!(["a", "b", "y", "z"])
    );
}

#[test]
fn test_apply_three_argument_string_index_on_array_replaces_with_map() {
    let state = json!({"statData": {"l": ["a"]}});
    let outcome = crate::apply("_.insert('l', 'k', 1);", &state);
    assert_eq!(outcome.into_value().unwrap()["statData"]["l"], json!({"k": 1}));
}

#[test]
fn test_apply_assign_scalar_into_map_leaves_map_but_marks_modified() {
    let state = json!({"statData": {"m": {"a": 1}}});
    for script in ["_.assign('m', 5);", "_.insert('m', 'oops');"] {
        let (outcome, reports) = Interpreter::default().apply_with_report(script, &state);
        assert_eq!(outcome, Outcome::Changed(state.clone()), "script {}", script);
        assert_eq!(reports[0].status, CommandStatus::Applied);
    }
}

#[test]
fn test_apply_report_statuses() {
    let state = json!({"statData": {"hp": 1, "name": "x"}});
    let script = "_.add('hp', 1); _.add('name', 1); _.set('only_path'); _.remove();";
    let (outcome, reports) = Interpreter::default().apply_with_report(script, &state);
    assert!(outcome.is_changed());
    let statuses: Vec<&CommandStatus> = reports.iter().map(|r| &r.status).collect();
    assert_eq!(statuses[0], &CommandStatus::Applied);
    assert_eq!(statuses[1], &CommandStatus::NoOp);
    assert_eq!(
        statuses[2],
        &CommandStatus::Failed(CommandError::MissingArguments {
            verb: Verb::Set,
            expected: 2,
            found: 1
        })
    );
    assert!(matches!(
        statuses[3],
        CommandStatus::Failed(CommandError::MissingArguments { verb: Verb::Remove, .. })
    ));
}

#[test]
fn test_apply_non_object_wrapper() {
    let state = json!([1, 2, 3]);
    let (outcome, reports) = Interpreter::default().apply_with_report("_.set('a', 1);", &state);
    assert_eq!(outcome, Outcome::NoChange);
    assert_eq!(reports[0].status, CommandStatus::Failed(CommandError::RootNotObject));
}

#[test]
fn test_apply_later_commands_see_earlier_effects() {
    let state = json!({"statData": {}});
    let script = "_.set('n', 1); _.add('n', 2); _.assign('l', [1]); _.assign('l', 2);";
    let value = crate::apply(script, &state).into_value().unwrap();
    assert_eq!(value["statData"], json!({"n": 3, "l": [1, 2]}));
}

#[test]
fn test_apply_distinct_paths_order_independent() {
    let state = json!({"statData": {}});
    let forward = crate::apply("_.set('a', 1); _.set('b.c', 'x'); _.set('d', [true]);", &state);
    let backward = crate::apply("_.set('d', [true]); _.set('b.c', 'x'); _.set('a', 1);", &state);
    assert_eq!(forward, backward);
    assert_eq!(
        forward,
        Outcome::Changed(json!({"statData": {"a": 1, "b": {"c": "x"}, "d": [true]}}))
    );
}
