use std::env;
use std::fs;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;

use hackaverse_runtime::{
    InputScript, ProximityEvent, QuizOutcome, QuizProgress, Scene, ScriptStep, Simulation,
};

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let xml = fs::read_to_string(&options.path)
        .with_context(|| format!("failed to read scene {}", options.path))?;
    let scene = Scene::from_xml(&xml).context("failed to parse scene XML")?;

    println!(
        "Loaded scene: avatar at {}, {} at {} (radius {:.2})",
        format_vec(scene.avatar.position),
        scene.npc.name,
        format_vec(scene.npc.position),
        scene.npc.radius
    );

    let mut sim = Simulation::new(&scene)?;
    sim.run(&options.script, options.frame_time)?;

    for (time, event) in sim.events() {
        let verb = match event {
            ProximityEvent::Entered => "entered",
            ProximityEvent::Left => "left",
        };
        println!(" - {time:.2}s {verb} {} range", scene.npc.name);
    }

    print_final_state(&sim);

    for option in &options.answers {
        match sim.answer(*option)? {
            QuizProgress::Next(index) => println!("Quiz: next question {}", index + 1),
            QuizProgress::Finished(QuizOutcome::Passed) => println!("Quiz passed"),
            QuizProgress::Finished(QuizOutcome::Failed { correct, total }) => {
                println!("Quiz failed ({correct}/{total} correct)")
            }
        }
    }

    Ok(())
}

fn print_final_state(sim: &Simulation) {
    let controller = sim.controller();
    let avatar = controller.avatar();
    let camera = controller.camera();
    println!(
        "avatar pos={} action={} run={}",
        format_vec(avatar.position),
        avatar.current_action,
        controller.toggle_run()
    );
    println!(
        "camera pos={} target={}",
        format_vec(camera.camera_position),
        format_vec(camera.orbit_target)
    );
}

fn format_vec(v: Vec3) -> String {
    format!("({:.2}, {:.2}, {:.2})", v.x, v.y, v.z)
}

struct CliOptions {
    path: String,
    frame_time: f32,
    script: InputScript,
    answers: Vec<usize>,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(path) = args.next() else {
            return Err(anyhow!(
                "Usage: hackaverse-runtime <scene.xml> [--dt SECONDS] [--walk] [--step KEYS:SECONDS]... [--answer N]..."
            ));
        };
        let mut frame_time = 1.0 / 60.0;
        let mut script = InputScript::default();
        let mut answers = Vec::new();
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| anyhow!("{flag} expects a value"))
            };
            match arg.as_str() {
                "--dt" => {
                    let raw = value("--dt")?;
                    frame_time = raw
                        .parse::<f32>()
                        .with_context(|| format!("invalid --dt value `{raw}`"))?;
                }
                "--walk" => script.steps.push(ScriptStep::ToggleRun),
                "--step" => script.steps.push(value("--step")?.parse()?),
                "--answer" => {
                    let raw = value("--answer")?;
                    answers.push(
                        raw.parse::<usize>()
                            .with_context(|| format!("invalid --answer value `{raw}`"))?,
                    );
                }
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --dt, --walk, --step or --answer"
                    ));
                }
            }
        }
        Ok(Self {
            path,
            frame_time,
            script,
            answers,
        })
    }
}
