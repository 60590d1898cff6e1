use mutation_events::{
    AttrChange, Document, InstallOutcome, MutationKind, NodeOrText, NotificationLog,
};
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::TestCaseResult;

#[derive(Debug, Clone)]
enum ChildSpec {
    Element(&'static str),
    Text(String),
}

#[derive(Debug, Clone)]
enum AttrOp {
    Set(String),
    Remove,
}

fn tag_strategy() -> BoxedStrategy<&'static str> {
    prop_oneof![
        Just("div"),
        Just("span"),
        Just("p"),
        Just("em"),
        Just("strong"),
        Just("section"),
        Just("article"),
        Just("li"),
    ]
    .boxed()
}

fn text_strategy() -> BoxedStrategy<String> {
    prop_oneof![
        "[a-z0-9 ]{0,12}".boxed(),
        Just(String::new()).boxed(),
        Just("日本語".to_string()).boxed(),
        Just("a & b < c".to_string()).boxed(),
    ]
    .boxed()
}

fn child_spec_strategy() -> BoxedStrategy<ChildSpec> {
    prop_oneof![
        tag_strategy().prop_map(ChildSpec::Element),
        text_strategy().prop_map(ChildSpec::Text),
    ]
    .boxed()
}

fn attr_op_strategy() -> BoxedStrategy<AttrOp> {
    prop_oneof![
        text_strategy().prop_map(AttrOp::Set),
        Just(AttrOp::Remove),
    ]
    .boxed()
}

fn installed_container() -> (Document, mutation_events::NodeId, NotificationLog) {
    let mut document = Document::new();
    let container = document.create_element("div");
    let attached = document.append_child(document.root(), container).is_ok();
    assert!(attached);
    assert_eq!(document.install_mutation_events(), InstallOutcome::Installed);
    let log = NotificationLog::attach(&mut document, container);
    (document, container, log)
}

fn assert_append_reports_one_pair_per_entry(specs: &[ChildSpec]) -> TestCaseResult {
    let (mut document, container, log) = installed_container();

    let mut nodes = Vec::new();
    for spec in specs {
        let child = match spec {
            ChildSpec::Element(tag) => document.create_element(tag),
            ChildSpec::Text(text) => document.create_text_node(text),
        };
        nodes.push(child);
    }
    let entries: Vec<NodeOrText> = nodes.iter().map(|node| NodeOrText::from(*node)).collect();
    prop_assert!(document.append(container, &entries).is_ok());

    let events = log.snapshot();
    prop_assert_eq!(events.len(), specs.len() * 2);
    for (index, node) in nodes.iter().enumerate() {
        prop_assert_eq!(events[2 * index].kind, MutationKind::NodeInserted);
        prop_assert_eq!(events[2 * index].target, *node);
        prop_assert_eq!(events[2 * index].related_node, Some(container));
        prop_assert_eq!(events[2 * index + 1].kind, MutationKind::SubtreeModified);
        prop_assert_eq!(events[2 * index + 1].target, container);
    }
    prop_assert_eq!(document.children(container).len(), specs.len());
    Ok(())
}

fn assert_attr_changes_follow_presence(ops: &[AttrOp]) -> TestCaseResult {
    let (mut document, container, log) = installed_container();
    let target = document.create_element("p");
    prop_assert!(document.append_child(container, target).is_ok());
    log.clear();

    let mut present: Option<String> = None;
    for (index, op) in ops.iter().enumerate() {
        let (expected_change, expected_prev, expected_new) = match op {
            AttrOp::Set(value) => {
                prop_assert!(document.set_attribute(target, "data-k", value).is_ok());
                let change = if present.is_some() {
                    AttrChange::Modification
                } else {
                    AttrChange::Addition
                };
                let prev = present.clone().unwrap_or_default();
                present = Some(value.clone());
                (change, prev, value.clone())
            }
            AttrOp::Remove => {
                prop_assert!(document.remove_attribute(target, "data-k").is_ok());
                let prev = present.take().unwrap_or_default();
                (AttrChange::Removal, prev, String::new())
            }
        };

        let events = log.snapshot();
        let pair = &events[2 * index..2 * index + 2];
        prop_assert_eq!(pair[0].kind, MutationKind::AttrModified);
        prop_assert_eq!(pair[0].target, target);
        prop_assert_eq!(pair[0].related_node, None);
        prop_assert_eq!(pair[0].attr_name.as_str(), "data-k");
        prop_assert_eq!(pair[0].attr_change, expected_change);
        prop_assert_eq!(pair[0].prev_value.as_str(), expected_prev.as_str());
        prop_assert_eq!(pair[0].new_value.as_str(), expected_new.as_str());
        prop_assert_eq!(pair[1].kind, MutationKind::SubtreeModified);
        prop_assert_eq!(pair[1].target, target);
    }
    prop_assert_eq!(log.len(), ops.len() * 2);
    prop_assert_eq!(document.attr(target, "data-k"), present);
    Ok(())
}

fn assert_character_data_chains_previous_values(leaf_kind: u8, values: &[String]) -> TestCaseResult {
    let (mut document, container, log) = installed_container();
    let leaf = match leaf_kind {
        0 => document.create_text_node("seed"),
        1 => document.create_comment("seed"),
        _ => document.create_processing_instruction("probe", "seed"),
    };
    prop_assert!(document.append_child(container, leaf).is_ok());
    log.clear();

    let mut state = "seed".to_string();
    for value in values {
        prop_assert!(document.set_text_content(leaf, value).is_ok());
        state = value.clone();
    }

    let events = log.snapshot();
    prop_assert_eq!(events.len(), values.len() * 2);
    let mut prev = "seed".to_string();
    for (index, value) in values.iter().enumerate() {
        let pair = &events[2 * index..2 * index + 2];
        prop_assert_eq!(pair[0].kind, MutationKind::CharacterDataModified);
        prop_assert_eq!(pair[0].target, leaf);
        prop_assert_eq!(pair[0].prev_value.as_str(), prev.as_str());
        prop_assert_eq!(pair[0].new_value.as_str(), value.as_str());
        prop_assert_eq!(pair[1].kind, MutationKind::SubtreeModified);
        prop_assert_eq!(pair[1].target, leaf);
        prev = value.clone();
    }
    prop_assert_eq!(document.character_data(leaf), Some(state));
    Ok(())
}

fn assert_inner_html_reports_removals_then_insertions(
    old_tags: &[&'static str],
    new_tags: &[&'static str],
) -> TestCaseResult {
    let (mut document, container, log) = installed_container();
    let mut old_nodes = Vec::new();
    for tag in old_tags {
        let child = document.create_element(tag);
        prop_assert!(document.append_child(container, child).is_ok());
        old_nodes.push(child);
    }
    log.clear();

    let markup: String = new_tags
        .iter()
        .map(|tag| format!("<{tag}></{tag}>"))
        .collect();
    prop_assert!(document.set_inner_html(container, &markup).is_ok());

    let events = log.snapshot();
    prop_assert_eq!(events.len(), old_tags.len() + new_tags.len() + 1);
    for (index, node) in old_nodes.iter().enumerate() {
        prop_assert_eq!(events[index].kind, MutationKind::NodeRemoved);
        prop_assert_eq!(events[index].target, *node);
        prop_assert_eq!(events[index].related_node, Some(container));
    }
    let children = document.children(container).to_vec();
    prop_assert_eq!(children.len(), new_tags.len());
    for (offset, (node, tag)) in children.iter().zip(new_tags.iter()).enumerate() {
        let event = &events[old_tags.len() + offset];
        prop_assert_eq!(event.kind, MutationKind::NodeInserted);
        prop_assert_eq!(event.target, *node);
        prop_assert_eq!(document.tag_name(*node), Some(*tag));
    }
    let last = &events[events.len() - 1];
    prop_assert_eq!(last.kind, MutationKind::SubtreeModified);
    prop_assert_eq!(last.target, container);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn append_reports_one_pair_per_entry(specs in vec(child_spec_strategy(), 0..12)) {
        assert_append_reports_one_pair_per_entry(&specs)?;
    }

    #[test]
    fn attribute_changes_follow_presence(ops in vec(attr_op_strategy(), 1..16)) {
        assert_attr_changes_follow_presence(&ops)?;
    }

    #[test]
    fn character_data_edits_chain_previous_values(
        leaf_kind in 0u8..3,
        values in vec(text_strategy(), 1..8),
    ) {
        assert_character_data_chains_previous_values(leaf_kind, &values)?;
    }

    #[test]
    fn inner_html_reports_removals_then_insertions(
        old_tags in vec(tag_strategy(), 0..6),
        new_tags in vec(tag_strategy(), 0..6),
    ) {
        assert_inner_html_reports_removals_then_insertions(&old_tags, &new_tags)?;
    }
}
