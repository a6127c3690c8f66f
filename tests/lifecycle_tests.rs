//! Integration tests for task lifecycle operations and their guards.

use std::sync::Arc;
use tasktree::db::Database;
use tasktree::error::ErrorCode;
use tasktree::guards::{OWNED_TASK, RequestContext};
use tasktree::integrity::{TreeIssue, check_database};
use tasktree::lifecycle::TaskService;
use tasktree::types::{NewTask, Task, TaskId, TaskPatch, UserId};

fn setup() -> TaskService {
    let db = Database::open_in_memory().expect("Failed to create in-memory database");
    TaskService::new(Arc::new(db))
}

fn new_task(title: &str, parent: Option<&TaskId>) -> NewTask {
    NewTask {
        title: title.to_string(),
        description: format!("{} description", title),
        parent_task: parent.cloned(),
        ..Default::default()
    }
}

fn load(svc: &TaskService, id: &TaskId) -> Task {
    svc.db()
        .get_task(id)
        .expect("Failed to get task")
        .expect("Task missing")
}

fn complete(svc: &TaskService, id: &TaskId) -> Task {
    let patch = TaskPatch {
        completed: Some(true),
        ..Default::default()
    };
    svc.edit(&load(svc, id), patch).expect("Failed to complete task")
}

mod create_tests {
    use super::*;

    #[test]
    fn create_sets_server_owned_fields() {
        let svc = setup();
        let owner = UserId::generate();

        let task = svc.create(&owner, new_task("root", None)).unwrap();

        assert_eq!(task.created_by, owner);
        assert!(!task.completed);
        assert!(task.parent_task.is_none());
        assert_eq!(load(&svc, &task.id), task);
    }

    #[test]
    fn create_requires_title_and_description() {
        let svc = setup();
        let owner = UserId::generate();

        let mut input = new_task("x", None);
        input.title = "  ".to_string();
        let err = svc.create(&owner, input).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
        assert_eq!(err.field.as_deref(), Some("title"));

        let mut input = new_task("x", None);
        input.description.clear();
        let err = svc.create(&owner, input).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("description"));
    }

    #[test]
    fn create_with_missing_parent_is_rejected() {
        let svc = setup();
        let err = svc
            .create(&UserId::generate(), new_task("orphan", Some(&TaskId::generate())))
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
        assert_eq!(err.field.as_deref(), Some("parentTask"));
        assert_eq!(svc.db().count_tasks().unwrap(), 0);
    }

    #[test]
    fn new_child_reopens_completed_ancestors() {
        let svc = setup();
        let owner = UserId::generate();
        let g = svc.create(&owner, new_task("g", None)).unwrap();
        let p = svc.create(&owner, new_task("p", Some(&g.id))).unwrap();
        complete(&svc, &p.id);
        assert!(load(&svc, &g.id).completed);

        svc.create(&owner, new_task("c", Some(&p.id))).unwrap();

        assert!(!load(&svc, &p.id).completed);
        assert!(!load(&svc, &g.id).completed);
    }

    #[test]
    fn child_of_another_users_task_is_allowed() {
        let svc = setup();
        let parent = svc.create(&UserId::generate(), new_task("p", None)).unwrap();
        let child = svc
            .create(&UserId::generate(), new_task("c", Some(&parent.id)))
            .unwrap();
        assert_eq!(child.parent_task, Some(parent.id));
    }
}

mod show_tests {
    use super::*;

    #[test]
    fn show_embeds_all_descendants() {
        let svc = setup();
        let owner = UserId::generate();
        let root = svc.create(&owner, new_task("root", None)).unwrap();
        let a = svc.create(&owner, new_task("a", Some(&root.id))).unwrap();
        svc.create(&owner, new_task("b", Some(&root.id))).unwrap();
        svc.create(&owner, new_task("a1", Some(&a.id))).unwrap();

        let tree = svc.show(load(&svc, &root.id)).unwrap();

        assert_eq!(tree.subtree_size(), 4);
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].task.title, "a");
        assert_eq!(tree.children[0].children[0].task.title, "a1");
        assert!(tree.children[1].children.is_empty());
    }

    #[test]
    fn show_handles_long_chains() {
        let svc = setup();
        let owner = UserId::generate();
        let root = svc.create(&owner, new_task("root", None)).unwrap();
        let mut parent = root.id.clone();
        for i in 0..2_000 {
            let link = Task {
                id: TaskId::generate(),
                title: format!("link {}", i),
                parent_task: Some(parent),
                ..root.clone()
            };
            svc.db().insert_task(&link).unwrap();
            parent = link.id;
        }

        let tree = svc.show(load(&svc, &root.id)).unwrap();

        assert_eq!(tree.subtree_size(), 2_001);
        let mut depth = 0;
        let mut node = &tree;
        while let Some(next) = node.children.first() {
            depth += 1;
            node = next;
        }
        assert_eq!(depth, 2_000);
        assert_eq!(node.task.title, "link 1999");
    }
}

mod edit_tests {
    use super::*;

    #[test]
    fn non_creator_is_refused_and_task_unchanged() {
        let svc = setup();
        let owner = UserId::generate();
        let task = svc.create(&owner, new_task("mine", None)).unwrap();

        let ctx = RequestContext::new(Some(UserId::generate())).with_task_id(task.id.clone());
        let err = OWNED_TASK.check(svc.db(), ctx).unwrap_err();

        assert_eq!(err.code, ErrorCode::TaskUnavailable);
        assert_eq!(load(&svc, &task.id), task);
    }

    #[test]
    fn creator_edit_applies_patch() {
        let svc = setup();
        let owner = UserId::generate();
        let task = svc.create(&owner, new_task("mine", None)).unwrap();

        let ctx = RequestContext::new(Some(owner)).with_task_id(task.id.clone());
        let task = OWNED_TASK.check(svc.db(), ctx).unwrap().into_task().unwrap();
        let patch = TaskPatch {
            description: Some("updated".to_string()),
            estimated_completion_time: Some(Some(2.5)),
            ..Default::default()
        };
        let updated = svc.edit(&task, patch).unwrap();

        assert_eq!(updated.description, "updated");
        assert_eq!(updated.estimated_completion_time, Some(2.5));
        assert_eq!(updated.title, "mine");
    }

    #[test]
    fn blank_title_patch_is_rejected() {
        let svc = setup();
        let task = svc.create(&UserId::generate(), new_task("t", None)).unwrap();
        let patch = TaskPatch {
            title: Some(String::new()),
            ..Default::default()
        };
        let err = svc.edit(&task, patch).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
        assert_eq!(load(&svc, &task.id).title, "t");
    }
}

mod fault_tests {
    use super::*;
    use tasktree::error::MSG_INTERNAL;

    #[test]
    fn completing_child_of_vanished_parent_is_a_server_error() {
        let svc = setup();
        let owner = UserId::generate();
        let parent = svc.create(&owner, new_task("p", None)).unwrap();
        let child = svc.create(&owner, new_task("c", Some(&parent.id))).unwrap();

        // Remove the parent row without detaching its child
        svc.db()
            .with_conn(|conn| {
                conn.execute("DELETE FROM tasks WHERE id = ?1", [parent.id.as_str()])?;
                Ok(())
            })
            .unwrap();

        let patch = TaskPatch {
            completed: Some(true),
            ..Default::default()
        };
        let err = svc.edit(&load(&svc, &child.id), patch).unwrap_err();

        assert_eq!(err.code, ErrorCode::PropagationFailed);
        assert_eq!(err.status(), 500);
        assert_eq!(err.message, MSG_INTERNAL);
    }
}

mod delete_tests {
    use super::*;

    #[test]
    fn delete_promotes_children_to_roots() {
        let svc = setup();
        let owner = UserId::generate();
        let p = svc.create(&owner, new_task("p", None)).unwrap();
        let a = svc.create(&owner, new_task("a", Some(&p.id))).unwrap();
        let b = svc.create(&owner, new_task("b", Some(&p.id))).unwrap();

        svc.delete(&load(&svc, &p.id)).unwrap();

        assert!(svc.db().get_task(&p.id).unwrap().is_none());
        assert!(load(&svc, &a.id).parent_task.is_none());
        assert!(load(&svc, &b.id).parent_task.is_none());
        assert!(check_database(svc.db()).unwrap().is_clean());
    }

    #[test]
    fn delete_of_missing_task_is_unavailable() {
        let svc = setup();
        let task = svc.create(&UserId::generate(), new_task("t", None)).unwrap();
        svc.delete(&task).unwrap();

        let err = svc.delete(&task).unwrap_err();
        assert_eq!(err.code, ErrorCode::TaskUnavailable);
    }
}

mod concurrency_tests {
    use super::*;
    use std::thread;

    #[test]
    fn concurrent_sibling_completions_settle_consistently() {
        let svc = setup();
        let owner = UserId::generate();
        let g = svc.create(&owner, new_task("g", None)).unwrap();
        let p = svc.create(&owner, new_task("p", Some(&g.id))).unwrap();
        let children: Vec<Task> = (0..8)
            .map(|i| {
                svc.create(&owner, new_task(&format!("c{}", i), Some(&p.id)))
                    .unwrap()
            })
            .collect();

        thread::scope(|scope| {
            for child in &children {
                let svc = svc.clone();
                scope.spawn(move || complete(&svc, &child.id));
            }
        });

        assert!(load(&svc, &p.id).completed);
        assert!(load(&svc, &g.id).completed);
        assert!(check_database(svc.db()).unwrap().is_clean());
    }

    #[test]
    fn create_racing_delete_never_leaves_dangling_parent() {
        let svc = setup();
        let owner = UserId::generate();

        for _ in 0..50 {
            let parent = svc.create(&owner, new_task("p", None)).unwrap();

            thread::scope(|scope| {
                let creator = svc.clone();
                let creator_owner = owner.clone();
                let parent_id = parent.id.clone();
                scope.spawn(move || {
                    for i in 0..20 {
                        // Fails with 400 once the parent is gone
                        let _ = creator.create(
                            &creator_owner,
                            new_task(&format!("c{}", i), Some(&parent_id)),
                        );
                    }
                });

                let deleter = svc.clone();
                let doomed = parent.clone();
                scope.spawn(move || deleter.delete(&doomed).unwrap());
            });
        }

        let report = check_database(svc.db()).unwrap();
        assert!(
            !report
                .issues
                .iter()
                .any(|i| matches!(i, TreeIssue::DanglingParent { .. })),
            "{:?}",
            report.issues
        );
    }
}
