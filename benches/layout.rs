use bpmn_autolayout::config::{Config, LayoutConfig};
use bpmn_autolayout::di::serialize;
use bpmn_autolayout::layout::compute_layout;
use bpmn_autolayout::parser::parse_bpmn;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

/// A chain of `nodes` tasks spread round-robin over `lanes` lanes, with a
/// loop-back every `loop_every` tasks.
fn lane_chain_source(nodes: usize, lanes: usize, loop_every: usize) -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL" id="Defs">
  <bpmn:process id="P">
"#,
    );
    if lanes > 0 {
        out.push_str("    <bpmn:laneSet id=\"LS\">\n");
        for lane in 0..lanes {
            out.push_str(&format!("      <bpmn:lane id=\"L{lane}\" name=\"Lane {lane}\">\n"));
            for node in (lane..nodes).step_by(lanes) {
                out.push_str(&format!("        <bpmn:flowNodeRef>T{node}</bpmn:flowNodeRef>\n"));
            }
            out.push_str("      </bpmn:lane>\n");
        }
        out.push_str("    </bpmn:laneSet>\n");
    }
    for node in 0..nodes {
        out.push_str(&format!("    <bpmn:task id=\"T{node}\" name=\"Task {node}\" />\n"));
    }
    for node in 0..nodes.saturating_sub(1) {
        out.push_str(&format!(
            "    <bpmn:sequenceFlow id=\"F{node}\" sourceRef=\"T{node}\" targetRef=\"T{}\" />\n",
            node + 1
        ));
    }
    if loop_every > 0 {
        for node in (loop_every..nodes).step_by(loop_every) {
            out.push_str(&format!(
                "    <bpmn:sequenceFlow id=\"B{node}\" sourceRef=\"T{node}\" targetRef=\"T{}\" />\n",
                node - loop_every / 2
            ));
        }
    }
    out.push_str("  </bpmn:process>\n</bpmn:definitions>\n");
    out
}

fn fixture(name: &str) -> &'static str {
    match name {
        "linear" => include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/linear.bpmn")),
        "lanes_split" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/lanes_split.bpmn"
        )),
        "inferred_lanes" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/inferred_lanes.bpmn"
        )),
        "subprocess" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/subprocess.bpmn"
        )),
        "collaboration" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/collaboration.bpmn"
        )),
        _ => panic!("unknown fixture {name}"),
    }
}

fn generated_inputs() -> Vec<(String, String)> {
    vec![
        ("chain_50".to_string(), lane_chain_source(50, 0, 0)),
        ("lanes_200".to_string(), lane_chain_source(200, 4, 0)),
        ("loops_500".to_string(), lane_chain_source(500, 5, 7)),
    ]
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, input) in generated_inputs() {
        group.bench_with_input(BenchmarkId::from_parameter(&name), &input, |b, data| {
            b.iter(|| parse_bpmn(black_box(data)).expect("parse failed"))
        });
    }
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let config = LayoutConfig::default();
    for (name, input) in generated_inputs() {
        let defs = parse_bpmn(&input).expect("parse failed");
        let process = defs.processes[0].clone();
        group.bench_with_input(BenchmarkId::from_parameter(&name), &process, |b, data| {
            b.iter(|| compute_layout(black_box(data), &config).expect("layout failed"))
        });
    }
    group.finish();
}

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize");
    let config = LayoutConfig::default();
    for (name, input) in generated_inputs() {
        let defs = parse_bpmn(&input).expect("parse failed");
        let process = defs.processes[0].clone();
        let layout = compute_layout(&process, &config).expect("layout failed");
        group.bench_with_input(BenchmarkId::from_parameter(&name), &layout, |b, data| {
            b.iter(|| serialize(black_box(&process), black_box(data)).to_xml())
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let config = Config::default();
    for name in ["linear", "lanes_split", "inferred_lanes", "subprocess", "collaboration"] {
        let input = fixture(name);
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, data| {
            b.iter(|| bpmn_autolayout::autolayout(black_box(data), &config).expect("pipeline failed"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_layout, bench_serialize, bench_end_to_end);
criterion_main!(benches);
