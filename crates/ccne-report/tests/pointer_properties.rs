use ccne_report::wizard::pointer::{get, set};
use ccne_report::wizard::{FormDocument, Node, Pointer};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Key(String),
    Index(usize),
}

fn steps() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec(
        prop_oneof![
            "[a-z]{1,6}".prop_map(Step::Key),
            (0usize..4).prop_map(Step::Index),
        ],
        1..5,
    )
}

fn pointer_from(steps: &[Step]) -> Pointer {
    steps.iter().fold(Pointer::root(), |pointer, step| match step {
        Step::Key(key) => pointer.key(key.clone()),
        Step::Index(index) => pointer.index(*index),
    })
}

fn leaf() -> impl Strategy<Value = Node> {
    prop_oneof![
        any::<bool>().prop_map(Node::from),
        any::<i64>().prop_map(Node::from),
        "[ -~]{0,12}".prop_map(Node::from),
    ]
}

fn document() -> impl Strategy<Value = Node> {
    prop::collection::vec((steps(), leaf()), 0..6).prop_map(|writes| {
        writes
            .into_iter()
            .fold(Node::record(), |doc, (path, value)| {
                set(&doc, &pointer_from(&path), value.clone()).unwrap_or(doc)
            })
    })
}

proptest! {
    #[test]
    fn get_returns_what_set_wrote(doc in document(), path in steps(), value in leaf()) {
        let pointer = pointer_from(&path);
        let before = doc.clone();
        if let Ok(updated) = set(&doc, &pointer, value.clone()) {
            prop_assert_eq!(get(&updated, &pointer), Some(&value));
        }
        prop_assert_eq!(doc, before);
    }

    #[test]
    fn writes_leave_sibling_sections_shared(key in "[a-z]{1,8}", value in leaf()) {
        let doc = Node::from_serialize(&FormDocument::default()).expect("document serializes");
        let pointer = Pointer::root().key("programInfo").key(key);
        let updated = set(&doc, &pointer, value).expect("program info is a record");

        for section in ["reportingWindow", "expectedOutcomes", "ivaEvidence"] {
            let section = Pointer::root().key(section);
            let before = get(&doc, &section).expect("section present");
            let after = get(&updated, &section).expect("section present");
            prop_assert!(before.shares_container(after));
        }
        let info = Pointer::root().key("programInfo");
        prop_assert!(!get(&doc, &info)
            .expect("present")
            .shares_container(get(&updated, &info).expect("present")));
    }

    #[test]
    fn append_onto_text_fields_fails(
        field in prop::sample::select(vec![
            "institutionName",
            "programName",
            "programLevel",
            "contactEmail",
        ]),
    ) {
        let doc = Node::from_serialize(&FormDocument::default()).expect("document serializes");
        let pointer = Pointer::root().key("programInfo").key(field).append();
        prop_assert!(set(&doc, &pointer, Node::from(true)).is_err());

        let cohorts = Pointer::root().key("reportingWindow").key("cohorts");
        let appended = set(&doc, &cohorts.clone().append(), Node::record())
            .expect("cohorts is an array");
        prop_assert_eq!(
            get(&appended, &cohorts).and_then(Node::as_array).map(<[Node]>::len),
            Some(2)
        );
    }
}
