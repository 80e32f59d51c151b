#![allow(missing_docs)]
#![cfg(not(feature = "loom"))]

mod common;

use common::{Journal, init_tracing};
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc,
    },
    thread,
    time::Duration,
};
use taskgraph::{
    config::GraphConfig,
    error::{GraphError, NodeError},
    graph::TaskGraph,
    node::NodeStatus,
};

#[test]
fn single_worker_runs_nodes_in_readiness_order() {
    init_tracing();
    let out = Arc::new(Mutex::new(String::new()));
    let mut graph = TaskGraph::new(1).unwrap();

    let append = |text: &'static str| {
        let out = Arc::clone(&out);
        move || out.lock().unwrap().push_str(text)
    };
    let task1 = graph.make_task("task1", append("task1->"));
    let task2 = graph.make_task("task2", append("task2->"));
    let task3 = graph.make_task("task3", append("task3->"));
    let task4 = graph.make_task("task4", append("task4"));

    graph.set_parent(task2, task1).unwrap();
    graph.set_parent(task4, task1).unwrap();
    graph.set_parent(task2, task3).unwrap();
    graph.set_parent(task4, task3).unwrap();
    graph.set_parent(task3, task1).unwrap();

    assert!(!graph.has_cycle());
    graph.execute().unwrap();

    assert_eq!(*out.lock().unwrap(), "task1->task3->task2->task4");
}

#[test]
fn completion_edges_order_side_effects_and_keep_values() {
    // task1 -> task2 -> task3 -> task5
    //            \---> task4 ---/
    init_tracing();
    let num = Arc::new(Mutex::new(-1_i32));
    let mut graph = TaskGraph::new(1).unwrap();

    let update = |f: fn(&mut i32)| {
        let num = Arc::clone(&num);
        move || f(&mut num.lock().unwrap())
    };
    let task1 = {
        let num = Arc::clone(&num);
        graph.make_node("task1", move || {
            *num.lock().unwrap() = 0;
            13
        })
    };
    let task2 = graph.make_task("task2", update(|n| *n = 1));
    let task3 = graph.make_task("task3", update(|n| *n += 2));
    let task4 = graph.make_task("task4", update(|n| *n *= 2));
    let task5 = graph.make_task("task5", update(|n| *n %= 5));

    graph.set_parent(task2, task1).unwrap();
    graph.set_parent(task3, task2).unwrap();
    graph.set_parent(task4, task2).unwrap();
    graph.set_parent(task5, task3).unwrap();
    graph.set_parent(task5, task4).unwrap();

    assert!(!graph.has_cycle());
    graph.execute().unwrap();

    assert_eq!(graph.value(task1).unwrap(), 13);
    assert_eq!(graph.value(task1).unwrap(), 13);
    assert_eq!(*num.lock().unwrap(), 1);
}

#[test]
fn independent_chains_run_in_parallel_and_join() {
    // fill0 -> min ---\
    //                  average
    // fill1 -> max ---/
    init_tracing();
    let mut graph = TaskGraph::new(2).unwrap();

    let fill = || -> Vec<f32> { (0..9_000_u16).map(|i| f32::from(i) - 4_500.0).collect() };
    let fill0 = graph.make_unique_node("fill0", fill);
    let fill1 = graph.make_unique_node("fill1", fill);
    let min = graph
        .make_node_with("min", (fill0,), |(values,)| {
            values.into_iter().fold(f32::INFINITY, f32::min)
        })
        .unwrap();
    let max = graph
        .make_node_with("max", (fill1,), |(values,)| {
            values.into_iter().fold(f32::NEG_INFINITY, f32::max)
        })
        .unwrap();
    let average = graph
        .make_node_with("average", (min, max), |(min, max)| min + 0.5 * (max - min))
        .unwrap();

    assert!(!graph.has_cycle());
    graph.execute().unwrap();

    assert_eq!(graph.value(min).unwrap(), -4_500.0);
    assert_eq!(graph.value(max).unwrap(), 4_499.0);
    assert_eq!(graph.value(average).unwrap(), -0.5);
}

#[test]
fn diamond_child_observes_both_parents() {
    init_tracing();
    let journal = Journal::default();
    let mut graph = TaskGraph::new(4).unwrap();

    let a = {
        let journal = journal.clone();
        graph.make_node("a", move || {
            journal.record("a");
            1
        })
    };
    let b = {
        let journal = journal.clone();
        graph
            .make_node_with("b", (a,), move |(a,)| {
                journal.record("b");
                a + 10
            })
            .unwrap()
    };
    let c = {
        let journal = journal.clone();
        graph
            .make_node_with("c", (a,), move |(a,)| {
                journal.record("c");
                a * 100
            })
            .unwrap()
    };
    let d = {
        let journal = journal.clone();
        graph
            .make_node_with("d", (b, c), move |(b, c)| {
                journal.record("d");
                b + c
            })
            .unwrap()
    };

    graph.execute().unwrap();

    assert_eq!(graph.value(d).unwrap(), 111);
    assert!(journal.position("a") < journal.position("b"));
    assert!(journal.position("a") < journal.position("c"));
    assert!(journal.position("b") < journal.position("d"));
    assert!(journal.position("c") < journal.position("d"));
    assert_eq!(journal.entries().len(), 4);
}

#[test]
fn child_of_three_racing_parents_runs_once_per_cycle() {
    init_tracing();
    let runs = Arc::new(AtomicUsize::new(0));
    let mut graph = TaskGraph::new(3).unwrap();

    let parents = [1, 2, 4].map(|value| graph.make_node(format!("p{value}"), move || value));
    let child = {
        let runs = Arc::clone(&runs);
        graph
            .make_node_with("sum", (parents[0], parents[1], parents[2]), move |(a, b, c)| {
                runs.fetch_add(1, Ordering::Relaxed);
                a + b + c
            })
            .unwrap()
    };

    for cycle in 1..=50 {
        graph.execute().unwrap();
        assert_eq!(graph.value(child).unwrap(), 7);
        assert_eq!(runs.load(Ordering::Relaxed), cycle);
        graph.reset();
    }
}

#[test]
fn disconnected_nodes_all_complete_before_execute_returns() {
    init_tracing();
    let done = Arc::new(AtomicUsize::new(0));
    let mut graph = TaskGraph::new(4).unwrap();
    for index in 0..16 {
        let done = Arc::clone(&done);
        graph.make_task(format!("leaf{index}"), move || {
            done.fetch_add(1, Ordering::Relaxed);
        });
    }

    graph.execute().unwrap();

    assert_eq!(done.load(Ordering::Relaxed), 16);
    assert!(graph.failed_nodes().is_empty());
}

#[test]
fn cycles_are_found_and_dags_are_not() {
    let mut graph = TaskGraph::new(1).unwrap();
    let a = graph.make_task("a", || {});
    let b = graph.make_task("b", || {});
    let c = graph.make_task("c", || {});
    graph.set_parent(b, a).unwrap();
    graph.set_parent(c, b).unwrap();
    assert!(!graph.has_cycle());

    graph.set_parent(a, c).unwrap();
    assert!(graph.has_cycle());
    assert_eq!(graph.find_cycle(), Some(vec![a.id(), b.id(), c.id()]));

    let mut dag = TaskGraph::new(1).unwrap();
    let a = dag.make_task("a", || {});
    let b = dag.make_task("b", || {});
    let c = dag.make_task("c", || {});
    let d = dag.make_task("d", || {});
    dag.set_parent(b, a).unwrap();
    dag.set_parent(c, a).unwrap();
    dag.set_parent(d, b).unwrap();
    dag.set_parent(d, c).unwrap();
    assert!(!dag.has_cycle());
    assert_eq!(dag.find_cycle(), None);
}

#[test]
fn cycle_check_rejects_cyclic_graphs_before_running() {
    init_tracing();
    let ran = Arc::new(AtomicBool::new(false));
    let mut graph = TaskGraph::with_config(GraphConfig {
        check_cycles: true,
        ..GraphConfig::with_workers(2)
    })
    .unwrap();

    let source = {
        let ran = Arc::clone(&ran);
        graph.make_task("source", move || ran.store(true, Ordering::Relaxed))
    };
    let x = graph.make_task("x", || {});
    let y = graph.make_task("y", || {});
    graph.set_parent(x, source).unwrap();
    graph.set_parent(y, x).unwrap();
    graph.set_parent(x, y).unwrap();

    let error = graph.execute().unwrap_err();
    let GraphError::Cycle { path } = error else {
        panic!("expected a cycle error, got {error:?}");
    };
    assert_eq!(path, ["x", "y"]);
    assert!(!ran.load(Ordering::Relaxed));
}

#[test]
fn move_only_result_with_two_consumers_fails_before_running() {
    init_tracing();
    let ran = Arc::new(AtomicBool::new(false));
    let mut graph = TaskGraph::new(2).unwrap();

    let producer = {
        let ran = Arc::clone(&ran);
        graph.make_unique_node("producer", move || {
            ran.store(true, Ordering::Relaxed);
            Box::new(5_u32)
        })
    };
    graph
        .make_task_with("first", (producer,), |(_value,)| {})
        .unwrap();
    graph
        .make_task_with("second", (producer,), |(_value,)| {})
        .unwrap();

    let error = graph.execute().unwrap_err();
    assert!(
        matches!(error, GraphError::MultipleConsumers { ref node, consumers: 2 } if node == "producer"),
        "unexpected error: {error:?}"
    );
    assert!(!ran.load(Ordering::Relaxed));
    assert_eq!(graph.status(producer).unwrap(), NodeStatus::Ready);
}

#[test]
fn move_only_result_is_transferred_to_its_single_consumer() {
    init_tracing();
    let mut graph = TaskGraph::new(2).unwrap();

    let producer = graph.make_unique_node("producer", || vec![String::from("payload")]);
    let consumer = graph
        .make_unique_node_with("consumer", (producer,), |(mut lines,)| {
            lines.push(String::from("appended"));
            lines
        })
        .unwrap();

    graph.execute().unwrap();

    assert!(matches!(
        graph.value(producer),
        Err(GraphError::ValueConsumed { .. })
    ));
    assert_eq!(graph.value(consumer).unwrap(), ["payload", "appended"]);
    assert!(matches!(
        graph.value(consumer),
        Err(GraphError::ValueConsumed { .. })
    ));
}

#[test]
fn value_reports_missing_results() {
    let mut graph = TaskGraph::new(1).unwrap();
    let node = graph.make_node("node", || 1_u8);
    let task = graph.make_task("task", || {});

    assert!(matches!(
        graph.value(node),
        Err(GraphError::NotExecuted { ref node }) if node == "node"
    ));

    graph.execute().unwrap();
    assert!(matches!(
        graph.value(task),
        Err(GraphError::NoValue { ref node }) if node == "task"
    ));
    assert_eq!(graph.value(node).unwrap(), 1);
}

#[test]
fn tasks_cannot_be_bound_as_value_inputs() {
    let mut graph = TaskGraph::new(1).unwrap();
    let task = graph.make_task("task", || {});

    let error = graph
        .make_node_with("reader", (task,), |((),)| 0)
        .unwrap_err();

    assert!(matches!(error, GraphError::NoValue { ref node } if node == "task"));
    assert_eq!(graph.len(), 1);
    assert!(graph.descendants(task).unwrap().is_empty());
}

#[test]
fn panicking_node_fails_its_value_consumers_only() {
    init_tracing();
    let follow_up_ran = Arc::new(AtomicBool::new(false));
    let mut graph = TaskGraph::new(2).unwrap();

    let broken = graph.make_node("broken", || -> u32 { panic!("boom") });
    let reader = graph
        .make_node_with("reader", (broken,), |(value,)| value + 1)
        .unwrap();
    let follow_up = {
        let follow_up_ran = Arc::clone(&follow_up_ran);
        graph.make_task("follow-up", move || {
            follow_up_ran.store(true, Ordering::Relaxed);
        })
    };
    graph.set_parent(follow_up, broken).unwrap();

    graph.execute().unwrap();

    assert!(follow_up_ran.load(Ordering::Relaxed));
    assert_eq!(
        graph.failure(broken).unwrap(),
        Some(NodeError::Panicked {
            message: "boom".to_owned()
        })
    );
    assert_eq!(
        graph.failure(reader).unwrap(),
        Some(NodeError::UpstreamFailed {
            parent: "broken".to_owned()
        })
    );
    assert!(matches!(
        graph.value(reader),
        Err(GraphError::NodeFailed { ref node, source: NodeError::UpstreamFailed { .. } }) if node == "reader"
    ));
    let failed: Vec<_> = graph.failed_nodes().into_iter().map(|(id, _)| id).collect();
    assert_eq!(failed, [broken.id(), reader.id()]);
    assert_eq!(graph.status(follow_up).unwrap(), NodeStatus::Completed);
}

/// A result whose duplication always panics.
#[derive(Debug)]
struct Fragile(u32);

impl Clone for Fragile {
    fn clone(&self) -> Self {
        panic!("fragile clone")
    }
}

#[test]
fn panicking_clone_fails_the_producer_without_blocking_execute() {
    init_tracing();
    let consumer_ran = Arc::new(AtomicBool::new(false));
    let mut graph = TaskGraph::new(2).unwrap();

    let producer = graph.make_node("producer", || Fragile(1));
    let consumer = {
        let consumer_ran = Arc::clone(&consumer_ran);
        graph
            .make_task_with("consumer", (producer,), move |(value,)| {
                consumer_ran.store(value.0 == 1, Ordering::Relaxed);
            })
            .unwrap()
    };
    let follow_up = graph.make_task("follow-up", || {});
    graph.set_parent(follow_up, producer).unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    let runner = thread::spawn(move || {
        let outcome = graph.execute();
        done_tx.send(outcome).unwrap();
        graph
    });
    done_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("execute did not return")
        .unwrap();
    let graph = runner.join().unwrap();

    assert!(!consumer_ran.load(Ordering::Relaxed));
    assert_eq!(
        graph.failure(producer).unwrap(),
        Some(NodeError::Panicked {
            message: "fragile clone".to_owned()
        })
    );
    assert_eq!(
        graph.failure(consumer).unwrap(),
        Some(NodeError::UpstreamFailed {
            parent: "producer".to_owned()
        })
    );
    assert_eq!(graph.status(producer).unwrap(), NodeStatus::Completed);
    assert_eq!(graph.status(follow_up).unwrap(), NodeStatus::Completed);
}

#[test]
fn reset_allows_running_the_same_graph_again() {
    init_tracing();
    let runs = Arc::new(AtomicUsize::new(0));
    let mut graph = TaskGraph::new(2).unwrap();

    let first = {
        let runs = Arc::clone(&runs);
        graph.make_node("first", move || runs.fetch_add(1, Ordering::Relaxed))
    };
    let second = graph
        .make_node_with("second", (first,), |(previous,)| previous * 10)
        .unwrap();

    graph.execute().unwrap();
    assert_eq!(graph.value(second).unwrap(), 0);
    assert!(matches!(graph.execute(), Err(GraphError::AlreadyExecuted)));

    graph.reset();
    assert_eq!(graph.pending_count(second).unwrap(), 1);
    assert_eq!(graph.status(first).unwrap(), NodeStatus::Ready);
    assert!(matches!(
        graph.value(second),
        Err(GraphError::NotExecuted { .. })
    ));

    graph.execute().unwrap();
    assert_eq!(graph.value(second).unwrap(), 10);
    assert_eq!(runs.load(Ordering::Relaxed), 2);
}

#[test]
fn structure_is_observable_through_handles() {
    let mut graph = TaskGraph::new(1).unwrap();
    assert!(graph.is_empty());

    let root = graph.make_node("root", || 2_i64);
    let squared = graph
        .make_node_with("squared", (root,), |(x,)| x * x)
        .unwrap();
    let log = graph.make_task("log", || {});
    graph.set_parent(log, root).unwrap();

    assert_eq!(graph.len(), 3);
    assert_eq!(
        graph.node_ids().collect::<Vec<_>>(),
        [root.id(), squared.id(), log.id()]
    );
    assert_eq!(graph.name(squared).unwrap(), "squared");
    assert_eq!(graph.descendants(root).unwrap(), [squared.id(), log.id()]);
    assert_eq!(graph.pending_count(root).unwrap(), 0);
    assert_eq!(graph.pending_count(squared).unwrap(), 1);
    assert_eq!(graph.status(squared).unwrap(), NodeStatus::Unscheduled);

    graph.execute().unwrap();
    assert_eq!(graph.pending_count(squared).unwrap(), 0);
    assert_eq!(graph.status(squared).unwrap(), NodeStatus::Completed);
    assert_eq!(graph.value(squared).unwrap(), 4);
}

#[test]
fn handles_do_not_cross_graphs_or_survive_clear() {
    let mut graph = TaskGraph::new(1).unwrap();
    let mut other = TaskGraph::new(1).unwrap();
    let node = graph.make_node("node", || 1);
    let foreign = other.make_node("foreign", || 2);

    assert!(matches!(
        graph.value(foreign),
        Err(GraphError::ForeignNode(id)) if id == foreign.id()
    ));
    assert!(matches!(
        graph.set_parent(node, foreign),
        Err(GraphError::ForeignNode(_))
    ));
    assert!(matches!(
        graph.make_node_with("mixed", (node, foreign), |(a, b)| a + b),
        Err(GraphError::ForeignNode(_))
    ));

    graph.clear();
    assert!(graph.is_empty());
    assert!(matches!(graph.name(node), Err(GraphError::ForeignNode(_))));

    let fresh = graph.make_node("fresh", || 3);
    assert_eq!(fresh.id().index(), node.id().index());
    assert_ne!(fresh.id(), node.id());
    graph.execute().unwrap();
    assert_eq!(graph.value(fresh).unwrap(), 3);
}

#[test]
fn self_dependency_is_rejected() {
    let mut graph = TaskGraph::new(1).unwrap();
    let node = graph.make_task("loop", || {});
    assert!(matches!(
        graph.set_parent(node, node),
        Err(GraphError::SelfDependency { ref node }) if node == "loop"
    ));
    assert!(!graph.has_cycle());
}

#[test]
fn empty_graph_executes_immediately() {
    let mut graph = TaskGraph::new(1).unwrap();
    graph.execute().unwrap();
    graph.execute().unwrap();
}

#[test]
fn graph_without_workers_refuses_to_execute() {
    let mut graph = TaskGraph::new(0).unwrap();
    let node = graph.make_node("node", || 1);
    assert!(matches!(graph.execute(), Err(GraphError::NoWorkers)));

    graph.resize_pool(2).unwrap();
    assert_eq!(graph.pool().size(), 2);
    graph.execute().unwrap();
    assert_eq!(graph.value(node).unwrap(), 1);
}
