//! Spec §8 scenario 1: a source feeding a stateless transform feeding a
//! sink, the simplest graph a builder can assemble. `Source[1,2,3]` is
//! mapped to its square, dropping odd values, and the sink's final tally
//! is printed once the run completes.

use npipeline::prelude::*;
use npipeline_graph::NodeOptions;
use npipeline_node::testing::{MapTransform, VecSink, VecSource};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut builder = GraphBuilder::new();

    let source = builder
        .add_source("numbers", VecSource::new("numbers", vec![1, 2, 3, 4, 5]), NodeOptions::default())
        .expect("source registration");
    let square = builder
        .add_transform(
            "square_evens",
            MapTransform::new(|x: i32| if x % 2 == 0 { Some(x * x) } else { None }),
            NodeOptions::default(),
        )
        .expect("transform registration");
    let sink = VecSink::new();
    let sink_handle = sink.handle();
    let sink_id = builder
        .add_sink("printer", sink, NodeOptions::default())
        .expect("sink registration");

    builder.connect(&source, &square);
    builder.connect(&square, &sink_id);

    let graph = builder.build().expect("linear source->transform->sink graph is valid");
    let pipeline = Pipeline::named("linear-pipeline", graph);

    let context = PipelineContext::new();
    let report = pipeline.run(context).await.expect("run completes without error");

    println!("completed nodes: {:?}", report.completed_nodes);
    println!("sink received: {:?}", sink_handle.received());
}
