use cpe_dialog::{DialogError, DialogStore, Message, Role};

fn ids_of(messages: &[Message]) -> Vec<String> {
    messages
        .iter()
        .map(|m| m.persisted_id().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn linear_save_then_read() {
    let store = DialogStore::open_in_memory().expect("open");
    let msgs = vec![
        Message::new(Role::User),
        Message::new(Role::Assistant),
        Message::new(Role::User),
    ];

    let saved: Vec<_> = store.save_dialog(msgs).collect();
    assert_eq!(saved.len(), 3);
    for (_, result) in &saved {
        assert!(result.is_ok());
    }
    let saved_ids = ids_of(&saved.iter().map(|(m, _)| m.clone()).collect::<Vec<_>>());

    let dialog = store
        .get_dialog_for_message(&saved_ids[2])
        .expect("get_dialog_for_message");
    assert_eq!(ids_of(&dialog), saved_ids);
}

#[test]
fn branching_conversation() {
    let store = DialogStore::open_in_memory().expect("open");

    let first_save: Vec<_> = store
        .save_dialog(vec![Message::new(Role::User), Message::new(Role::Assistant)])
        .collect();
    let root_id = first_save[0].0.persisted_id().expect("root id").to_string();
    let a_id = first_save[1].0.persisted_id().expect("a id").to_string();

    let mut root_again = Message::new(Role::User);
    root_again
        .extra_fields
        .insert("cpe_message_id".to_string(), serde_json::json!(root_id));
    let second_save: Vec<_> = store
        .save_dialog(vec![root_again, Message::new(Role::Assistant)])
        .collect();
    for (_, result) in &second_save {
        assert!(result.is_ok());
    }
    let b_id = second_save[1].0.persisted_id().expect("b id").to_string();

    let listed = store.list_messages(0, true).expect("list ascending");
    let listed_ids = ids_of(&listed);
    assert_eq!(listed_ids, vec![root_id.clone(), a_id.clone(), b_id.clone()]);

    let dialog_for_b = store.get_dialog_for_message(&b_id).expect("dialog for b");
    assert_eq!(ids_of(&dialog_for_b), vec![root_id.clone(), b_id.clone()]);

    store
        .delete_messages(&[a_id.clone()], false)
        .expect("delete leaf a");

    let dialog_for_b_after = store
        .get_dialog_for_message(&b_id)
        .expect("dialog for b after delete");
    assert_eq!(ids_of(&dialog_for_b_after), vec![root_id, b_id]);
}

#[test]
fn parent_chain_mismatch_leaves_store_unchanged() {
    let store = DialogStore::open_in_memory().expect("open");

    let chain_x: Vec<_> = store
        .save_dialog(vec![Message::new(Role::User), Message::new(Role::Assistant)])
        .collect();
    let x_root = chain_x[0].0.persisted_id().expect("x root").to_string();

    let chain_y: Vec<_> = store.save_dialog(vec![Message::new(Role::User)]).collect();
    let y_root = chain_y[0].0.persisted_id().expect("y root").to_string();

    let before_count = store.list_messages(0, true).expect("list").len();

    let mut x_root_msg = Message::new(Role::User);
    x_root_msg
        .extra_fields
        .insert("cpe_message_id".to_string(), serde_json::json!(x_root));
    let mut y_root_msg = Message::new(Role::User);
    y_root_msg
        .extra_fields
        .insert("cpe_message_id".to_string(), serde_json::json!(y_root));

    let attempt: Vec<_> = store.save_dialog(vec![x_root_msg, y_root_msg]).collect();
    assert!(attempt[0].1.is_ok());
    assert!(matches!(
        attempt[1].1,
        Err(DialogError::ParentChainMismatch { .. })
    ));

    let after_count = store.list_messages(0, true).expect("list").len();
    assert_eq!(before_count, after_count);
}

#[test]
fn non_recursive_delete_of_parent_with_children_fails() {
    let store = DialogStore::open_in_memory().expect("open");
    let saved: Vec<_> = store
        .save_dialog(vec![Message::new(Role::User), Message::new(Role::Assistant)])
        .collect();
    let root_id = saved[0].0.persisted_id().expect("root").to_string();

    let before = store.list_messages(0, true).expect("list").len();
    let result = store.delete_messages(&[root_id], false);
    assert!(matches!(result, Err(DialogError::HasChildren { .. })));
    let after = store.list_messages(0, true).expect("list").len();
    assert_eq!(before, after);
}

/// A recursive delete of a root removes every message reachable through
/// `parent_id` from that root, including messages saved in a later batch
/// that re-attached under it (the store has no notion of "batch").
#[test]
fn recursive_delete_removes_every_descendant_reattached_under_the_root() {
    let store = DialogStore::open_in_memory().expect("open");
    let saved: Vec<_> = store
        .save_dialog(vec![Message::new(Role::User), Message::new(Role::Assistant)])
        .collect();
    let root_id = saved[0].0.persisted_id().expect("root").to_string();

    let mut root_again = Message::new(Role::User);
    root_again
        .extra_fields
        .insert("cpe_message_id".to_string(), serde_json::json!(root_id.clone()));
    let second_branch: Vec<_> = store
        .save_dialog(vec![root_again, Message::new(Role::Assistant)])
        .collect();
    let second_branch_id = second_branch[1].0.persisted_id().expect("branch").to_string();

    store
        .delete_messages(&[root_id], true)
        .expect("recursive delete");

    let remaining = store.list_messages(0, true).expect("list");
    assert!(
        remaining.is_empty(),
        "recursive delete of root removes every descendant: {remaining:?}"
    );
    assert!(store.get_messages(&[second_branch_id]).is_err());
}

/// Deleting one root's subtree must not touch an unrelated, independent
/// root and its own children.
#[test]
fn recursive_delete_does_not_touch_an_independent_sibling_root() {
    let store = DialogStore::open_in_memory().expect("open");

    let tree_a: Vec<_> = store
        .save_dialog(vec![Message::new(Role::User), Message::new(Role::Assistant)])
        .collect();
    let root_a = tree_a[0].0.persisted_id().expect("root a").to_string();

    let tree_b: Vec<_> = store
        .save_dialog(vec![Message::new(Role::User), Message::new(Role::Assistant)])
        .collect();
    let root_b = tree_b[0].0.persisted_id().expect("root b").to_string();
    let leaf_b = tree_b[1].0.persisted_id().expect("leaf b").to_string();

    store
        .delete_messages(&[root_a], true)
        .expect("recursive delete of tree a");

    let remaining = store.list_messages(0, true).expect("list");
    assert_eq!(ids_of(&remaining), vec![root_b.clone(), leaf_b.clone()]);
    assert!(store.get_messages(&[root_b, leaf_b]).is_ok());
}

#[test]
fn empty_save_commits_empty_transaction() {
    let store = DialogStore::open_in_memory().expect("open");
    let saved: Vec<_> = store.save_dialog(Vec::<cpe_dialog::Message>::new()).collect();
    assert!(saved.is_empty());
    assert!(store.list_messages(0, true).expect("list").is_empty());
}

#[test]
fn early_break_commits_partial_work() {
    let store = DialogStore::open_in_memory().expect("open");
    {
        let mut iter = store.save_dialog(vec![
            Message::new(Role::User),
            Message::new(Role::Assistant),
            Message::new(Role::User),
        ]);
        // Consume only the first message, then drop the iterator early.
        let first = iter.next();
        assert!(first.is_some());
    }

    let listed = store.list_messages(0, true).expect("list");
    assert_eq!(listed.len(), 1, "partial save should commit the one message already emitted");
}

#[test]
fn block_round_trip_preserves_content_and_extra_fields() {
    let store = DialogStore::open_in_memory().expect("open");
    let block = cpe_dialog::Block {
        id: Some("blk1".to_string()),
        block_type: "text".to_string(),
        modality: "text".to_string(),
        mime_type: Some("text/plain".to_string()),
        content: "hello world".to_string(),
        extra_fields: Some(serde_json::json!({"source": "tool-x"})),
    };
    let message = Message::new(Role::Assistant).with_blocks(vec![block.clone()]);

    let saved: Vec<_> = store.save_dialog(vec![message]).collect();
    let id = saved[0].0.persisted_id().expect("id").to_string();

    let fetched = store.get_messages(&[id]).expect("get_messages");
    assert_eq!(fetched[0].blocks.len(), 1);
    assert_eq!(fetched[0].blocks[0], block);
}

#[test]
fn get_messages_unknown_id_is_not_found() {
    let store = DialogStore::open_in_memory().expect("open");
    let result = store.get_messages(&["zzzzzz".to_string()]);
    assert!(matches!(result, Err(DialogError::NotFound { .. })));
}
