// tests/spec_compliance.rs
//
// Query execution against the example documents of the JSONPath draft,
// exercised through execute_query directly. Documents containing mappings
// enumerate children in unspecified order, so those cases compare result
// multisets instead of sequences.

use jetpath::{execute_query, parse_query, FunctionRegistry, Record, ResultSet, Value};
use serde_json::json;

fn run(query: &str, data: &Value, allow_missing_keys: bool) -> Vec<Value> {
    let parsed = parse_query("spec", query).unwrap_or_else(|e| panic!("{}", e));
    let functions = FunctionRegistry::new();
    let results = execute_query(&parsed, data, data, false, allow_missing_keys, &functions, false)
        .unwrap_or_else(|e| panic!("query {:?} failed: {}", query, e));
    results.elems.into_iter().cloned().collect()
}

fn run_err(query: &str, data: &Value, allow_missing_keys: bool) -> jetpath::ExecutionError {
    let parsed = parse_query("spec", query).unwrap_or_else(|e| panic!("{}", e));
    let functions = FunctionRegistry::new();
    match execute_query(&parsed, data, data, false, allow_missing_keys, &functions, false) {
        Ok(rs) => panic!("query {:?} unexpectedly returned {} results", query, rs.len()),
        Err(e) => e,
    }
}

fn assert_ordered(query: &str, data: &Value, allow: bool, expected: &[Value]) {
    let results = run(query, data, allow);
    assert_eq!(results, expected, "ordered results of {:?}", query);
}

fn assert_unordered(query: &str, data: &Value, allow: bool, expected: &[Value]) {
    let mut remaining = run(query, data, allow);
    assert_eq!(remaining.len(), expected.len(), "result count of {:?}", query);
    for e in expected {
        let pos = remaining
            .iter()
            .position(|r| r == e)
            .unwrap_or_else(|| panic!("{:?}: expected element {:?} not found", query, e));
        remaining.remove(pos);
    }
}

fn v(j: serde_json::Value) -> Value {
    Value::from(j)
}

// The canonical bookstore. The store itself is a record so that child
// enumeration order is deterministic: book before bicycle.
fn store_data() -> Value {
    let book = v(json!([
        {"category": "reference", "author": "Nigel Rees", "title": "Sayings of the Century", "price": 8.95},
        {"category": "fiction", "author": "Evelyn Waugh", "title": "Sword of Honour", "price": 12.99},
        {"category": "fiction", "author": "Herman Melville", "title": "Moby Dick", "isbn": "0-553-21311-3", "price": 8.99},
        {"category": "fiction", "author": "J. R. R. Tolkien", "title": "The Lord of the Rings", "isbn": "0-395-19395-8", "price": 22.99}
    ]));
    let bicycle = v(json!({"color": "red", "price": 399}));
    Value::Record(
        Record::new().field(
            "store",
            Value::Record(Record::new().field("book", book).field("bicycle", bicycle)),
        ),
    )
}

fn book(i: usize) -> Value {
    match &store_data() {
        Value::Record(store_rec) => match store_rec.get("store") {
            Some(Value::Record(rec)) => match rec.get("book") {
                Some(Value::Array(books)) => books[i].clone(),
                _ => unreachable!(),
            },
            _ => unreachable!(),
        },
        _ => unreachable!(),
    }
}

// ============================================================================
// Bookstore examples
// ============================================================================

#[test]
fn test_all_book_authors() {
    let expected: Vec<Value> = ["Nigel Rees", "Evelyn Waugh", "Herman Melville", "J. R. R. Tolkien"]
        .iter()
        .map(|s| v(json!(s)))
        .collect();
    assert_ordered("$.'store'.'book'[*].'author'", &store_data(), false, &expected);
    assert_ordered("$..'author'", &store_data(), false, &expected);
}

#[test]
fn test_all_prices_in_the_store() {
    let expected: Vec<Value> = vec![
        v(json!(8.95)),
        v(json!(12.99)),
        v(json!(8.99)),
        v(json!(22.99)),
        v(json!(399)),
    ];
    assert_ordered("$.'store'..'price'", &store_data(), false, &expected);
}

#[test]
fn test_book_by_index() {
    assert_ordered("$..'book'[2]", &store_data(), false, &[book(2)]);
    assert_ordered("$..'book'[-1]", &store_data(), false, &[book(3)]);
}

#[test]
fn test_first_two_books() {
    assert_ordered("$..'book'[0,1]", &store_data(), false, &[book(0), book(1)]);
    assert_ordered("$..'book'[:2]", &store_data(), false, &[book(0), book(1)]);
}

#[test]
fn test_books_with_isbn() {
    // not every book carries an isbn, so missing keys must be tolerated
    assert_ordered("$..'book'[?(@.'isbn')]", &store_data(), true, &[book(2), book(3)]);
}

#[test]
fn test_books_cheaper_than_ten() {
    assert_ordered("$..'book'[?(@.'price'<10)]", &store_data(), false, &[book(0), book(2)]);
}

#[test]
fn test_book_titles_cheaper_than_ten() {
    assert_ordered(
        "$..'book'[?(@.'price'<10)].'title'",
        &store_data(),
        false,
        &[v(json!("Sayings of the Century")), v(json!("Moby Dick"))],
    );
}

// ============================================================================
// Name selector
// ============================================================================

fn name_selector_data() -> Value {
    v(json!({
        "o": {"j j": {"k.k": 3}},
        "'": {"@": 2}
    }))
}

#[test]
fn test_named_value_in_nested_object() {
    assert_ordered("$.o['j j']['k.k']", &name_selector_data(), false, &[v(json!(3))]);
    assert_ordered(r#"$.o["j j"]["k.k"]"#, &name_selector_data(), false, &[v(json!(3))]);
}

#[test]
fn test_unusual_member_names() {
    assert_ordered(r#"$["'"]["@"]"#, &name_selector_data(), false, &[v(json!(2))]);
}

// ============================================================================
// Index and slice selectors
// ============================================================================

#[test]
fn test_element_of_array() {
    let data = v(json!(["a", "b"]));
    assert_ordered("$[1]", &data, false, &[v(json!("b"))]);
    assert_ordered("$[-2]", &data, false, &[v(json!("a"))]);
}

fn slice_data() -> Value {
    v(json!(["a", "b", "c", "d", "e", "f", "g"]))
}

#[test]
fn test_slice_with_default_step() {
    assert_ordered("$[1:3]", &slice_data(), false, &[v(json!("b")), v(json!("c"))]);
}

#[test]
fn test_slice_with_no_end() {
    assert_ordered("$[5:]", &slice_data(), false, &[v(json!("f")), v(json!("g"))]);
}

#[test]
fn test_slice_with_step_two() {
    assert_ordered("$[1:5:2]", &slice_data(), false, &[v(json!("b")), v(json!("d"))]);
}

#[test]
fn test_slice_with_negative_step() {
    assert_ordered("$[5:1:-2]", &slice_data(), false, &[v(json!("f")), v(json!("d"))]);
}

#[test]
fn test_slice_in_reverse_order() {
    let expected: Vec<Value> = ["g", "f", "e", "d", "c", "b", "a"]
        .iter()
        .map(|s| v(json!(s)))
        .collect();
    assert_ordered("$[::-1]", &slice_data(), false, &expected);
}

#[test]
fn test_slice_boundary_behaviors() {
    // step 0 selects nothing, as does a step pointing away from the range
    assert_ordered("$[0:6:0]", &slice_data(), false, &[]);
    assert_ordered("$[0:6:-1]", &slice_data(), false, &[]);
    assert_ordered("$[3:1]", &slice_data(), false, &[]);
    assert_ordered("$[0:0]", &slice_data(), false, &[]);
    assert_ordered("$[-5:-5]", &slice_data(), false, &[]);
    assert_ordered("$[-2:]", &slice_data(), false, &[v(json!("f")), v(json!("g"))]);
}

// ============================================================================
// Filter selectors
// ============================================================================

fn filter_data() -> Value {
    v(json!({
        "a": [3, 5, 1, 2, 4, 6, {"b": "j"}, {"b": "k"}, {"b": {}}, {"b": "kilo"}],
        "o": {"p": 1, "q": 2, "r": 3, "s": 5, "t": {"u": 6}},
        "e": "f"
    }))
}

#[test]
fn test_member_value_comparison() {
    assert_ordered(
        "$.'a'[?@.'b' == 'kilo']",
        &filter_data(),
        true,
        &[v(json!({"b": "kilo"}))],
    );
}

#[test]
fn test_array_value_comparison() {
    assert_ordered(
        "$.'a'[?@>3.5]",
        &filter_data(),
        false,
        &[v(json!(5)), v(json!(4)), v(json!(6))],
    );
}

#[test]
fn test_array_value_existence() {
    assert_ordered(
        "$.'a'[?@.'b']",
        &filter_data(),
        true,
        &[
            v(json!({"b": "j"})),
            v(json!({"b": "k"})),
            v(json!({"b": {}})),
            v(json!({"b": "kilo"})),
        ],
    );
}

#[test]
fn test_existence_of_non_singular_queries() {
    let a = v(json!([3, 5, 1, 2, 4, 6, {"b": "j"}, {"b": "k"}, {"b": {}}, {"b": "kilo"}]));
    let o = v(json!({"p": 1, "q": 2, "r": 3, "s": 5, "t": {"u": 6}}));
    assert_unordered("$[?@.*]", &filter_data(), false, &[a, o]);
}

#[test]
fn test_nested_filters() {
    let a = v(json!([3, 5, 1, 2, 4, 6, {"b": "j"}, {"b": "k"}, {"b": {}}, {"b": "kilo"}]));
    assert_ordered("$[?@[?@.'b']]", &filter_data(), true, &[a]);
}

#[test]
fn test_union_of_filters_repeats_results() {
    assert_unordered(
        "$.'o'[?@<3, ?@<3]",
        &filter_data(),
        false,
        &[v(json!(1)), v(json!(2)), v(json!(2)), v(json!(1))],
    );
}

#[test]
fn test_logical_or_in_filter() {
    assert_ordered(
        r#"$.'a'[?@<2 || @.'b' == "k"]"#,
        &filter_data(),
        true,
        &[v(json!(1)), v(json!({"b": "k"}))],
    );
}

#[test]
fn test_regular_expression_match_is_anchored() {
    assert_ordered(
        r#"$.'a'[?match(@.'b', "[jk]")]"#,
        &filter_data(),
        true,
        &[v(json!({"b": "j"})), v(json!({"b": "k"}))],
    );
}

#[test]
fn test_regular_expression_search_matches_substrings() {
    assert_ordered(
        r#"$.'a'[?search(@.'b', "[jk]")]"#,
        &filter_data(),
        true,
        &[v(json!({"b": "j"})), v(json!({"b": "k"})), v(json!({"b": "kilo"}))],
    );
}

#[test]
fn test_logical_and_in_filter() {
    assert_unordered(
        "$.'o'[?@>1 && @<4]",
        &filter_data(),
        false,
        &[v(json!(2)), v(json!(3))],
    );
}

#[test]
fn test_logical_or_existence_in_filter() {
    assert_unordered(
        "$.'o'[?@.'u' || @.'x']",
        &filter_data(),
        true,
        &[v(json!({"u": 6}))],
    );
}

#[test]
fn test_comparison_of_queries_with_no_values() {
    // @.'b' and $.'x' are both missing for the scalar elements: missing
    // equals missing, while a present value never equals a missing one
    assert_ordered(
        "$.'a'[?(@.'b' == $.'x')]",
        &filter_data(),
        true,
        &[v(json!(3)), v(json!(5)), v(json!(1)), v(json!(2)), v(json!(4)), v(json!(6))],
    );
}

#[test]
fn test_comparisons_of_primitive_and_structured_values() {
    let a: Vec<Value> = match v(json!([3, 5, 1, 2, 4, 6, {"b": "j"}, {"b": "k"}, {"b": {}}, {"b": "kilo"}]))
    {
        Value::Array(elems) => elems,
        _ => unreachable!(),
    };
    assert_ordered("$.'a'[?(@ == @)]", &filter_data(), false, &a);
}

#[test]
fn test_comparison_with_multi_element_result_set_errors() {
    let err = run_err("$[?$.'a'[*] <= 'abc']", &filter_data(), true);
    assert!(err.msg.contains("multiple elements"), "got: {}", err.msg);
}

#[test]
fn test_undefined_function_call_errors() {
    let err = run_err("$[?nosuchfct(.'a')]", &filter_data(), true);
    assert!(err.msg.contains("does not exist"), "got: {}", err.msg);
}

// ============================================================================
// Descendant segments
// ============================================================================

fn descendant_data() -> Value {
    v(json!({
        "o": {"j": 1, "k": 2},
        "a": [5, 3, [{"j": 4}, {"k": 6}]]
    }))
}

#[test]
fn test_descendant_name() {
    assert_unordered("$..'j'", &descendant_data(), false, &[v(json!(1)), v(json!(4))]);
}

#[test]
fn test_descendant_index() {
    assert_unordered(
        "$..[0]",
        &descendant_data(),
        false,
        &[v(json!(5)), v(json!({"j": 4}))],
    );
}

#[test]
fn test_descendant_wildcard() {
    let expected = vec![
        v(json!({"j": 1, "k": 2})),
        v(json!([5, 3, [{"j": 4}, {"k": 6}]])),
        v(json!(1)),
        v(json!(2)),
        v(json!(5)),
        v(json!(3)),
        v(json!([{"j": 4}, {"k": 6}])),
        v(json!({"j": 4})),
        v(json!({"k": 6})),
        v(json!(4)),
        v(json!(6)),
    ];
    assert_unordered("$..[*]", &descendant_data(), false, &expected);
    assert_unordered("$..*", &descendant_data(), false, &expected);
}

#[test]
fn test_descendant_visits_the_input_value() {
    assert_unordered(
        "$..'o'",
        &descendant_data(),
        false,
        &[v(json!({"j": 1, "k": 2}))],
    );
}

#[test]
fn test_descendant_multiple_indices() {
    assert_unordered(
        "$.'a'..[0, 1]",
        &descendant_data(),
        false,
        &[v(json!(5)), v(json!(3)), v(json!({"j": 4})), v(json!({"k": 6}))],
    );
}

#[test]
fn test_descendant_on_scalar_is_empty() {
    assert_ordered("$..'x'", &v(json!(42)), false, &[]);
    assert_ordered("..x", &v(json!("scalar")), true, &[]);
}

// ============================================================================
// Null semantics
// ============================================================================

fn null_data() -> Value {
    v(json!({"a": null, "b": [null], "c": [{}], "null": 1}))
}

#[test]
fn test_null_is_a_value() {
    assert_ordered("$.'a'", &null_data(), false, &[Value::Null]);
    assert_ordered("$.'b'[0]", &null_data(), false, &[Value::Null]);
    assert_ordered("$.'b'[*]", &null_data(), false, &[Value::Null]);
}

#[test]
fn test_null_has_no_children() {
    assert_ordered("$.'a'[0]", &null_data(), false, &[]);
    assert_ordered("$.a.d", &null_data(), false, &[]);
}

#[test]
fn test_null_exists_and_compares_equal_to_null() {
    assert_ordered("$.'b'[?@]", &null_data(), false, &[Value::Null]);
    assert_ordered("$.'b'[?@==null]", &null_data(), false, &[Value::Null]);
}

#[test]
fn test_missing_does_not_equal_null() {
    assert_ordered("$.'c'[?(@.d==null)]", &null_data(), true, &[]);
}

#[test]
fn test_null_member_name_is_just_a_string() {
    assert_ordered("$.null", &null_data(), false, &[v(json!(1))]);
}

// ============================================================================
// Record documents
// ============================================================================

fn person(first: &str, last: &str, age: i64) -> Value {
    Value::Record(
        Record::new()
            .field("firstName", Value::String(first.to_string()))
            .field("lastName", Value::String(last.to_string()))
            .field("age", Value::Int(age)),
    )
}

fn household_data() -> Value {
    let persons = Value::Array(vec![
        person("Homer", "Simpson", 39),
        person("Marge", "Simpson", 36),
        person("Bart", "Simpson", 10),
        person("Lisa", "Simpson", 8),
        person("Maggie", "Simpson", 1),
    ]);
    let dog = Value::Record(
        Record::new()
            .field("color", Value::String("brown".to_string()))
            .field("age", Value::Int(7)),
    );
    let cat = Value::Record(Record::new().field("color", Value::String("black".to_string())));
    let mut animals_map = std::collections::HashMap::new();
    animals_map.insert("Santa's Little Helper".to_string(), dog);
    animals_map.insert("Snowball V".to_string(), cat);
    let visitors = Value::Array(vec![
        person("Abe", "Simpson", 86),
        person("Selma", "Bouvier", 36),
    ]);
    Value::Record(
        Record::new()
            .field("persons", persons)
            .field("animals", Value::Mapping(animals_map))
            .field("address", Value::String("742 Evergreen Terrace".to_string()))
            .field("visitors", visitors),
    )
}

#[test]
fn test_record_name_selector() {
    assert_ordered(
        "$.'persons'[0].'firstName'",
        &household_data(),
        false,
        &[v(json!("Homer"))],
    );
}

#[test]
fn test_record_filter_on_field() {
    assert_ordered(
        "$.persons[?@.'firstName'=='Homer'].'firstName'",
        &household_data(),
        false,
        &[v(json!("Homer"))],
    );
}

#[test]
fn test_record_descendant_name_selector() {
    let expected: Vec<Value> = ["Homer", "Marge", "Bart", "Lisa", "Maggie", "Abe", "Selma"]
        .iter()
        .map(|s| v(json!(s)))
        .collect();
    assert_ordered("..'firstName'", &household_data(), false, &expected);
}

#[test]
fn test_record_index_union() {
    assert_ordered(
        ".'persons'[1, -2].'firstName'",
        &household_data(),
        false,
        &[v(json!("Marge")), v(json!("Lisa"))],
    );
}

#[test]
fn test_record_slices() {
    assert_ordered(
        ".'persons'[2:4].'firstName'",
        &household_data(),
        false,
        &[v(json!("Bart")), v(json!("Lisa"))],
    );
    assert_ordered(
        ".'persons'[ :3:2 ].'firstName'",
        &household_data(),
        false,
        &[v(json!("Homer")), v(json!("Bart"))],
    );
    assert_ordered(
        ".'persons'[ 3::-2].'firstName'",
        &household_data(),
        false,
        &[v(json!("Lisa")), v(json!("Marge"))],
    );
    assert_ordered(
        ".'persons'[-2:: ].'firstName'",
        &household_data(),
        false,
        &[v(json!("Lisa")), v(json!("Maggie"))],
    );
    assert_ordered(
        ".'persons'[ -2:-4:-1 ].'firstName'",
        &household_data(),
        false,
        &[v(json!("Lisa")), v(json!("Bart"))],
    );
}

#[test]
fn test_record_descendant_filter() {
    assert_ordered(
        "..[?.'age'>38].'firstName'",
        &household_data(),
        true,
        &[v(json!("Homer")), v(json!("Abe"))],
    );
}

#[test]
fn test_record_descendant_filter_multiple_selectors() {
    assert_ordered(
        "..[?.'age'>38]['firstName', 'age']",
        &household_data(),
        false,
        &[v(json!("Homer")), v(json!(39)), v(json!("Abe")), v(json!(86))],
    );
}

#[test]
fn test_record_traversal_through_mapping_keys() {
    assert_ordered(
        "..\"Snowball V\".'color'",
        &household_data(),
        false,
        &[v(json!("black"))],
    );
}

#[test]
fn test_logical_and_comparison_in_descendant_filter() {
    assert_ordered(
        "..[?.'firstName'&&.'age' > 80].'age'",
        &household_data(),
        false,
        &[v(json!(86))],
    );
}

#[test]
fn test_union_of_filter_selectors() {
    assert_ordered(
        "..[?.'firstName' == 'Lisa' , ? .'color' == 'brown'].'age'",
        &household_data(),
        false,
        &[v(json!(8)), v(json!(7))],
    );
}

#[test]
fn test_length_function_in_filter() {
    assert_ordered(
        "$..[?length(.'firstName')<=3].'firstName'",
        &household_data(),
        false,
        &[v(json!("Abe"))],
    );
}

#[test]
fn test_duplicates_from_union_selectors() {
    assert_ordered(
        "$..[?length(.'firstName')<=4, ?.'age'>80].'firstName'",
        &household_data(),
        false,
        &[v(json!("Bart")), v(json!("Lisa")), v(json!("Abe")), v(json!("Abe"))],
    );
}

fn custom_fct<'a>(
    _args: &[Option<jetpath::QueryResult<'a>>],
) -> Result<Option<jetpath::QueryResult<'a>>, jetpath::ExecutionError> {
    Ok(Some(jetpath::QueryResult::Singular(
        jetpath::Singular::Float(1.034e-12),
    )))
}

#[test]
fn test_custom_registered_function() {
    let parsed = parse_query(
        "custom",
        "$..[?length(.'firstName')<=3 && custom(.'firstName') < 0.01].'firstName'",
    )
    .unwrap();
    let mut functions = FunctionRegistry::new();
    functions.register("custom", Box::new(custom_fct)).unwrap();
    let data = household_data();
    let results = execute_query(&parsed, &data, &data, false, false, &functions, false).unwrap();
    assert_eq!(results.elems, vec![&v(json!("Abe"))]);
}

#[test]
fn test_absolute_query_inside_filter() {
    assert_ordered(
        "$..[?length(.'firstName')<=3 && $.'address'].'firstName'",
        &household_data(),
        false,
        &[v(json!("Abe"))],
    );
}

#[test]
fn test_relative_query_inside_filter_finds_nothing() {
    assert_ordered(
        "$..[?length(.'firstName')<=3 && @.'address'].'firstName'",
        &household_data(),
        false,
        &[],
    );
}

#[test]
fn test_incomparable_values_compare_false() {
    assert_ordered(
        "$..[?length(.'firstName')<=3 && $.'address' < 1.00e-2].'firstName'",
        &household_data(),
        false,
        &[],
    );
}

#[test]
fn test_whole_document_query() {
    let data = household_data();
    let results = run("$", &data, false);
    assert_eq!(results, vec![data]);
}

// ============================================================================
// Missing-key policy
// ============================================================================

#[test]
fn test_missing_key_errors_when_not_allowed() {
    let data = v(json!({"present": 1}));
    let err = run_err("$.absent", &data, false);
    assert!(err.msg.contains("missing key"), "got: {}", err.msg);
    assert_ordered("$.absent", &data, true, &[]);
}

#[test]
fn test_negative_index_out_of_bounds() {
    let data = v(json!([1, 2, 3]));
    let err = run_err("$[-5]", &data, false);
    assert!(err.msg.contains("missing key"), "got: {}", err.msg);
    assert_ordered("$[-5]", &data, true, &[]);
}

#[test]
fn test_executor_never_mutates_the_input() {
    let data = store_data();
    let before = data.clone();
    let _ = run("$..'price'", &data, false);
    let _ = run("$..'book'[?(@.'price'<10)].'title'", &data, false);
    assert_eq!(data, before);
}

#[test]
fn test_existence_only_short_circuits_to_a_result() {
    // existence-only execution may stop early but must agree on emptiness
    let parsed = parse_query("exist", "$..'author'").unwrap();
    let functions = FunctionRegistry::new();
    let data = store_data();
    let eager: ResultSet = execute_query(&parsed, &data, &data, false, false, &functions, false).unwrap();
    let lazy: ResultSet = execute_query(&parsed, &data, &data, true, false, &functions, false).unwrap();
    assert!(!eager.is_empty());
    assert!(!lazy.is_empty());
}
