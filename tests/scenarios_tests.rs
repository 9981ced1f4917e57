use rust_decimal::Decimal;
use tabulate::{
    Aggregation, CastOptions, Computation, DataType, JoinOptions, Table, Value,
};

fn table_of(names: &[&str], types: &[DataType], rows: Vec<Vec<&str>>) -> Table {
    let rows = rows
        .into_iter()
        .map(|r| r.into_iter().map(|s| s.to_string()).collect())
        .collect();
    Table::from_raw_rows(
        names.iter().map(|s| s.to_string()).collect(),
        types.to_vec(),
        rows,
        None,
        &CastOptions::default(),
    )
    .unwrap()
}

fn number(d: i64) -> Value {
    Value::Number(Decimal::from(d))
}

// ── 1. Construction and select ──────────────────────────────────

#[test]
fn construction_and_select() {
    let t = table_of(
        &["letter", "number"],
        &[DataType::Text, DataType::Number],
        vec![vec!["a", "1"], vec!["b", "2"], vec!["c", ""]],
    );

    let selected = t.select(&["letter"]).unwrap();
    let letters: Vec<Value> = selected.rows().map(|r| r.get("letter").unwrap().clone()).collect();
    assert_eq!(
        letters,
        vec![
            Value::Text("a".to_string()),
            Value::Text("b".to_string()),
            Value::Text("c".to_string()),
        ]
    );

    let number_col = t.column("number").unwrap();
    assert_eq!(number_col.get(2), Some(&Value::Null));
}

// ── 2. Where + aggregate ─────────────────────────────────────────

#[test]
fn where_then_aggregate() {
    let mut rows: Vec<Vec<&str>> = vec!["11", "12", "12", "13", "13", "13", "13", "14", "14", "14"]
        .into_iter()
        .map(|v| vec![v])
        .collect();
    for _ in 0..9 {
        rows.push(vec![""]);
    }
    let t = table_of(&["age"], &[DataType::Number], rows);

    let non_null = t.where_rows(|row| !row.get("age").unwrap().is_null());

    let count = non_null
        .aggregate_one(&Aggregation::Count { column: Some("age".to_string()), value: None })
        .unwrap()
        .scalar()
        .unwrap();
    assert_eq!(count, number(0));

    let median = non_null
        .aggregate_one(&Aggregation::Median { column: "age".to_string() })
        .unwrap()
        .scalar()
        .unwrap();
    assert_eq!(median, number(13));
}

// ── 3. Compute + group_by + aggregate ───────────────────────────

#[test]
fn compute_group_by_aggregate() {
    let t = table_of(
        &["state", "convicted", "exonerated"],
        &[DataType::Text, DataType::Number, DataType::Number],
        vec![
            vec!["DC", "1990", "2017"],
            vec!["DC", "1980", "2007"],
            vec!["NE", "1985", "2005"],
        ],
    );

    let with_yrs = t
        .compute(&[("yrs", Computation::Change { from: "convicted".to_string(), to: "exonerated".to_string() })], false)
        .unwrap();

    let grouped = with_yrs.group_by_column("state").unwrap();
    let result = grouped
        .aggregate(&[
            ("count", Aggregation::Count { column: None, value: None }),
            ("median", Aggregation::Median { column: "yrs".to_string() }),
        ])
        .unwrap();

    let mut by_state: Vec<(Value, Value, Value)> = result
        .rows()
        .map(|r| (r.get("state").unwrap().clone(), r.get("count").unwrap().clone(), r.get("median").unwrap().clone()))
        .collect();
    by_state.sort_by_key(|(state, _, _)| format!("{state:?}"));

    assert_eq!(
        by_state,
        vec![
            (Value::Text("DC".to_string()), number(2), number(27)),
            (Value::Text("NE".to_string()), number(1), number(20)),
        ]
    );
}

// ── 4. Join (left outer, multi-row right) ───────────────────────

#[test]
fn left_outer_join_with_multi_row_right() {
    let left = table_of(&["id", "letter"], &[DataType::Number, DataType::Text], vec![
        vec!["1", "a"],
        vec!["2", "b"],
        vec!["3", "c"],
    ]);
    let right = table_of(&["id", "letter"], &[DataType::Number, DataType::Text], vec![
        vec!["1", "x"],
        vec!["1", "y"],
        vec!["4", "z"],
    ]);

    let joined = left.join(&right, &["id"], None, &JoinOptions::default()).unwrap();
    let rows: Vec<(Value, Value, Value)> = joined
        .rows()
        .map(|r| (r.get("id").unwrap().clone(), r.get("letter").unwrap().clone(), r.get("letter2").unwrap().clone()))
        .collect();
    assert_eq!(
        rows,
        vec![
            (number(1), Value::Text("a".to_string()), Value::Text("x".to_string())),
            (number(1), Value::Text("a".to_string()), Value::Text("y".to_string())),
            (number(2), Value::Text("b".to_string()), Value::Null),
            (number(3), Value::Text("c".to_string()), Value::Null),
        ]
    );

    let inner_opts = JoinOptions { inner: true, ..Default::default() };
    let inner = left.join(&right, &["id"], None, &inner_opts).unwrap();
    assert_eq!(inner.len(), 2);
}

// ── 5. Pivot (rows × columns with Sum) ──────────────────────────

#[test]
fn pivot_rows_and_columns_with_sum() {
    let t = table_of(
        &["race", "gender", "age"],
        &[DataType::Text, DataType::Text, DataType::Number],
        vec![
            vec!["black", "male", "20"],
            vec!["black", "female", "30"],
            vec!["white", "male", "25"],
        ],
    );

    let pivoted = t
        .pivot(&["race"], Some(&["gender"]), Aggregation::Sum { column: "age".to_string() }, None)
        .unwrap();

    let mut rows: Vec<(Value, Value, Value)> = pivoted
        .rows()
        .map(|r| (r.get("race").unwrap().clone(), r.get("male").unwrap().clone(), r.get("female").unwrap().clone()))
        .collect();
    rows.sort_by_key(|(race, _, _)| format!("{race:?}"));

    assert_eq!(
        rows,
        vec![
            (Value::Text("black".to_string()), number(20), number(30)),
            (Value::Text("white".to_string()), number(25), number(0)),
        ]
    );
}

// ── 6. Bins ──────────────────────────────────────────────────────

#[test]
fn bins_histogram() {
    let t = table_of(
        &["age"],
        &[DataType::Number],
        vec![vec!["5"], vec!["15"], vec!["25"], vec!["25"], vec!["95"]],
    );

    let binned = t.bins("age", 10, Some(Decimal::from(0)), Some(Decimal::from(100))).unwrap();
    let counts: Vec<i64> = binned
        .rows()
        .map(|r| match r.get("count").unwrap() {
            Value::Number(d) => d.to_string().parse().unwrap(),
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(counts, vec![1, 1, 2, 0, 0, 0, 0, 0, 0, 1]);
}

// ── Quantified invariants ────────────────────────────────────────

#[test]
fn null_sort_position_holds_for_either_direction() {
    let t = table_of(
        &["n"],
        &[DataType::Number],
        vec![vec!["3"], vec![""], vec!["1"], vec![""], vec!["2"]],
    );
    for reverse in [false, true] {
        let sorted = t.order_by_column("n", reverse).unwrap();
        let nulls: Vec<bool> = sorted.rows().map(|r| r.get("n").unwrap().is_null()).collect();
        let first_null = nulls.iter().position(|&n| n);
        if let Some(idx) = first_null {
            assert!(nulls[idx..].iter().all(|&n| n));
        }
    }
}

#[test]
fn aggregation_nullability_on_all_null_column() {
    let t = table_of(&["n"], &[DataType::Number], vec![vec![""], vec![""], vec![""]]);
    let mean = t.aggregate_one(&Aggregation::Mean { column: "n".to_string() }).unwrap().scalar().unwrap();
    assert_eq!(mean, Value::Null);
    let sum = t.aggregate_one(&Aggregation::Sum { column: "n".to_string() }).unwrap().scalar().unwrap();
    assert_eq!(sum, number(0));
    let count_nulls = t
        .aggregate_one(&Aggregation::Count { column: Some("n".to_string()), value: None })
        .unwrap()
        .scalar()
        .unwrap();
    assert_eq!(count_nulls, number(3));
}

#[test]
fn normalize_denormalize_round_trips() {
    let t = table_of(
        &["id", "height", "weight"],
        &[DataType::Number, DataType::Number, DataType::Number],
        vec![vec!["1", "180", "80"], vec!["2", "170", "65"]],
    );
    let long = t.normalize(&["id"], &["height", "weight"], "property", "value").unwrap();
    let wide = long.denormalize(&["id"], "property", "value", None).unwrap();

    let original: Vec<(Value, Value, Value)> = t
        .rows()
        .map(|r| (r.get("id").unwrap().clone(), r.get("height").unwrap().clone(), r.get("weight").unwrap().clone()))
        .collect();
    let round_tripped: Vec<(Value, Value, Value)> = wide
        .rows()
        .map(|r| (r.get("id").unwrap().clone(), r.get("height").unwrap().clone(), r.get("weight").unwrap().clone()))
        .collect();
    assert_eq!(original, round_tripped);
}

#[test]
fn bins_total_equals_row_count() {
    let t = table_of(&["n"], &[DataType::Number], vec![vec!["1"], vec!["2"], vec![""], vec!["50"]]);
    let binned = t.bins("n", 5, Some(Decimal::from(0)), Some(Decimal::from(10))).unwrap();
    let total: i64 = binned
        .rows()
        .map(|r| match r.get("count").unwrap() {
            Value::Number(d) => d.to_string().parse::<i64>().unwrap(),
            _ => unreachable!(),
        })
        .sum();
    assert_eq!(total, 4);
}

#[test]
fn tableset_members_share_the_originating_schema() {
    let t = table_of(
        &["group", "value"],
        &[DataType::Text, DataType::Number],
        vec![vec!["a", "1"], vec!["b", "2"], vec!["a", "3"]],
    );
    let set = t.group_by_column("group").unwrap();
    for (_, member) in set.iter() {
        if let tabulate::TableSetMember::Table(member_table) = member {
            assert_eq!(member_table.schema().names(), t.schema().names());
            assert_eq!(member_table.schema().types(), t.schema().types());
        }
    }
}

#[test]
fn min_max_over_date_column() {
    let t = table_of(
        &["born"],
        &[DataType::Date],
        vec![vec!["1990-05-01"], vec!["1815-12-10"], vec!["2000-01-01"], vec![""]],
    );
    let min = t.aggregate_one(&Aggregation::Min { column: "born".to_string() }).unwrap().scalar().unwrap();
    let max = t.aggregate_one(&Aggregation::Max { column: "born".to_string() }).unwrap().scalar().unwrap();
    assert_eq!(min, Value::Date(chrono::NaiveDate::from_ymd_opt(1815, 12, 10).unwrap()));
    assert_eq!(max, Value::Date(chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()));
}

#[test]
fn mode_rejects_timedelta_column() {
    let t = table_of(&["span"], &[DataType::TimeDelta], vec![vec!["1d"], vec!["1d"], vec!["2d"]]);
    let err = t.aggregate_one(&Aggregation::Mode { column: "span".to_string() }).unwrap_err();
    assert!(matches!(err, tabulate::TabulateError::DataType { .. }));
}

#[test]
fn rename_columns_only_preserves_row_names() {
    let t = Table::from_raw_rows(
        vec!["letter".to_string(), "number".to_string()],
        vec![DataType::Text, DataType::Number],
        vec![vec!["a".to_string(), "1".to_string()], vec!["b".to_string(), "2".to_string()]],
        Some(vec!["first".to_string(), "second".to_string()]),
        &CastOptions::default(),
    )
    .unwrap();

    let renamed = t.rename(Some(vec!["ltr".to_string(), "num".to_string()]), None, false, false).unwrap();
    assert!(renamed.has_row_names());
    assert_eq!(
        renamed.row_by_name("second").unwrap().get("num").unwrap(),
        &number(2)
    );
}

#[test]
fn rank_with_custom_comparer_orders_text_by_length() {
    let t = table_of(&["word"], &[DataType::Text], vec![vec!["ab"], vec!["a"], vec!["abc"]]);
    type Comparer = std::sync::Arc<dyn Fn(&Value, &Value) -> std::cmp::Ordering + Send + Sync>;
    let comparer: Comparer = std::sync::Arc::new(|a, b| match (a, b) {
        (Value::Text(x), Value::Text(y)) => x.len().cmp(&y.len()),
        _ => std::cmp::Ordering::Equal,
    });
    let ranked = t
        .compute(
            &[(
                "rank",
                Computation::Rank { column: "word".to_string(), reverse: false, comparer: Some(comparer) },
            )],
            false,
        )
        .unwrap();
    let ranks: Vec<Value> = ranked.rows().map(|r| r.get("rank").unwrap().clone()).collect();
    assert_eq!(ranks, vec![number(2), number(1), number(3)]);
}

#[test]
fn formula_cast_coerces_output_and_cast_false_bypasses() {
    let t = table_of(&["n"], &[DataType::Number], vec![vec!["1"], vec!["2"]]);

    let cast_on = t
        .compute(
            &[(
                "label",
                Computation::Formula {
                    output_type: DataType::Text,
                    f: std::sync::Arc::new(|row| match row.get("n") {
                        Some(Value::Number(d)) => Value::Text(d.to_string()),
                        _ => Value::Null,
                    }),
                    cast: true,
                },
            )],
            false,
        )
        .unwrap();
    assert_eq!(cast_on.schema().data_type("label"), Some(DataType::Text));

    let bad_cast = t.compute(
        &[(
            "doubled",
            Computation::Formula {
                output_type: DataType::Number,
                f: std::sync::Arc::new(|row| match row.get("n") {
                    Some(Value::Number(d)) => Value::Text((*d * Decimal::from(2)).to_string()),
                    _ => Value::Null,
                }),
                cast: false,
            },
        )],
        false,
    );
    // cast=false passes the raw Text straight through without coercion.
    let bad_cast = bad_cast.unwrap();
    assert_eq!(bad_cast.column("doubled").unwrap().get(0), Some(&Value::Text("2".to_string())));
}

#[test]
fn pivot_with_default_aggregation_matches_group_by_count() {
    let t = table_of(
        &["x", "y"],
        &[DataType::Text, DataType::Number],
        vec![vec!["a", "1"], vec!["a", "2"], vec!["b", "3"]],
    );
    let pivoted = t.pivot(&["x"], None, Aggregation::Count { column: None, value: None }, None).unwrap();
    let grouped = t
        .group_by_column("x")
        .unwrap()
        .aggregate(&[("Count", Aggregation::Count { column: None, value: None })])
        .unwrap();

    let mut from_pivot: Vec<(Value, Value)> =
        pivoted.rows().map(|r| (r.get("x").unwrap().clone(), r.get("value").unwrap().clone())).collect();
    let mut from_group_by: Vec<(Value, Value)> =
        grouped.rows().map(|r| (r.get("x").unwrap().clone(), r.get("Count").unwrap().clone())).collect();
    from_pivot.sort_by_key(|(k, _)| format!("{k:?}"));
    from_group_by.sort_by_key(|(k, _)| format!("{k:?}"));
    assert_eq!(from_pivot, from_group_by);
}
