//! Narrated promise scenarios.
//!
//! Each scenario builds promises in a synchronous "script" turn, then hands
//! control to the event loop and records what happened, in order, into a
//! [`Transcript`].

use crate::error::{CliError, CliResult};
use async_runtime::{
    all, all_settled, any, delay, race, timeout, EventLoop, EventLoopConfig, Promise, Task,
};
use clap::ValueEnum;
use core_types::RuntimeError;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

type P<T> = Promise<T, RuntimeError>;

/// The available scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Observers run after the synchronous code that resolved the promise
    Ordering,
    /// Values flow through a chain of `then` handlers
    Chaining,
    /// A handler returns a promise and the chain waits for it
    Flattening,
    /// A rejection skips fulfillment handlers until a `catch`
    Recovery,
    /// `all` and its first-rejection-wins rule
    All,
    /// `all_settled` reports every outcome
    AllSettled,
    /// `race` settles with the fastest input
    Race,
    /// `any` takes the first fulfillment
    Any,
    /// A slow operation raced against a deadline
    Timeout,
    /// A rejection nobody handles is reported, not fatal
    Unhandled,
}

impl Scenario {
    /// Every scenario, in presentation order.
    pub fn all() -> &'static [Scenario] {
        &[
            Scenario::Ordering,
            Scenario::Chaining,
            Scenario::Flattening,
            Scenario::Recovery,
            Scenario::All,
            Scenario::AllSettled,
            Scenario::Race,
            Scenario::Any,
            Scenario::Timeout,
            Scenario::Unhandled,
        ]
    }

    /// The command-line name.
    pub fn name(&self) -> String {
        self.to_possible_value()
            .map(|value| value.get_name().to_string())
            .unwrap_or_default()
    }

    /// One-line description.
    pub fn summary(&self) -> &'static str {
        match self {
            Scenario::Ordering => {
                "observers run after the synchronous code that resolved the promise"
            }
            Scenario::Chaining => "values flow through a chain of then handlers",
            Scenario::Flattening => "a handler returns a promise and the chain waits for it",
            Scenario::Recovery => "a rejection skips fulfillment handlers until a catch",
            Scenario::All => "all fulfills in input order, or rejects with the first rejection",
            Scenario::AllSettled => "all_settled reports every outcome",
            Scenario::Race => "race settles with the fastest input",
            Scenario::Any => "any takes the first fulfillment",
            Scenario::Timeout => "a slow operation raced against a deadline",
            Scenario::Unhandled => "a rejection nobody handles is reported, not fatal",
        }
    }
}

/// What a scenario printed, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transcript {
    /// Scenario name
    pub scenario: String,
    /// Narration lines
    pub lines: Vec<String>,
    /// Unhandled rejections the loop detected
    pub unhandled_rejections: Vec<String>,
}

#[derive(Clone, Default)]
struct Log(Rc<RefCell<Vec<String>>>);

impl Log {
    fn push(&self, line: impl Into<String>) {
        self.0.borrow_mut().push(line.into());
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

/// Runs one scenario on a fresh event loop.
pub fn run_scenario(scenario: Scenario, config: &EventLoopConfig) -> CliResult<Transcript> {
    let mut event_loop = EventLoop::with_config(config.clone());
    let log = Log::default();
    tracing::info!(scenario = %scenario.name(), "running scenario");

    match scenario {
        Scenario::Ordering => ordering(&mut event_loop, &log)?,
        Scenario::Chaining => chaining(&mut event_loop, &log)?,
        Scenario::Flattening => flattening(&mut event_loop, &log)?,
        Scenario::Recovery => recovery(&mut event_loop, &log)?,
        Scenario::All => all_scenario(&mut event_loop, &log)?,
        Scenario::AllSettled => all_settled_scenario(&mut event_loop, &log)?,
        Scenario::Race => race_scenario(&mut event_loop, &log)?,
        Scenario::Any => any_scenario(&mut event_loop, &log)?,
        Scenario::Timeout => timeout_scenario(&mut event_loop, &log)?,
        Scenario::Unhandled => unhandled(&mut event_loop, &log)?,
    }

    // Catch rejections that settled during the last turn.
    event_loop.run_all_microtasks()?;

    Ok(Transcript {
        scenario: scenario.name(),
        lines: log.take(),
        unhandled_rejections: event_loop
            .unhandled_rejections()
            .iter()
            .map(ToString::to_string)
            .collect(),
    })
}

fn settled_value<T, E>(
    event_loop: &mut EventLoop,
    promise: &Promise<T, E>,
    scenario: Scenario,
) -> CliResult<Result<T, E>>
where
    T: Clone + 'static,
    E: Clone + std::fmt::Debug + 'static,
{
    event_loop
        .run_until_settled(promise)?
        .map(|settlement| settlement.into_result())
        .ok_or_else(|| CliError::Unsettled {
            scenario: scenario.name(),
        })
}

fn ordering(event_loop: &mut EventLoop, log: &Log) -> CliResult<()> {
    let (promise, resolver) = P::<i32>::pending();

    for observer in 1..=2 {
        let log = log.clone();
        let _ = promise.then(move |value| {
            log.push(format!("observer {observer} sees {value}"));
            Ok(value)
        });
    }

    log.push("resolving with 1");
    resolver.resolve(1);
    log.push("synchronous code after resolve");

    event_loop.run_until_done()?;
    Ok(())
}

fn chaining(event_loop: &mut EventLoop, log: &Log) -> CliResult<()> {
    let step = |log: &Log| {
        let log = log.clone();
        move |x: i32| {
            log.push(format!("{x} * 2 = {}", x * 2));
            Ok(x * 2)
        }
    };

    let result = P::new(|resolver| {
        resolver.resolve(1);
        Ok(())
    })
    .then(step(log))
    .then(step(log))
    .then(step(log));

    match settled_value(event_loop, &result, Scenario::Chaining)? {
        Ok(value) => log.push(format!("final value {value}")),
        Err(error) => log.push(format!("chain failed: {error}")),
    }
    Ok(())
}

fn flattening(event_loop: &mut EventLoop, log: &Log) -> CliResult<()> {
    let handle = event_loop.handle();
    let inner_log = log.clone();

    let result = P::resolved("user-42").and_then(move |id: &'static str| {
        inner_log.push(format!("looking up {id}, answer arrives in 100ms"));
        let log = inner_log.clone();
        let timer_handle = handle.clone();
        P::new(move |resolver| {
            timer_handle.set_timeout(
                Duration::from_millis(100),
                Task::new(move || {
                    log.push("lookup finished");
                    resolver.resolve(5);
                    Ok(())
                }),
            );
            Ok(())
        })
    });

    let outcome = settled_value(event_loop, &result, Scenario::Flattening)?;
    log.push(format!(
        "chain settled at {}ms with {outcome:?}",
        event_loop.now().as_millis()
    ));
    Ok(())
}

fn recovery(event_loop: &mut EventLoop, log: &Log) -> CliResult<()> {
    let skipped = log.clone();
    let caught = log.clone();
    let cleanup = log.clone();

    let result = P::<i32>::rejected(RuntimeError::custom("disk unavailable"))
        .then(move |value| {
            skipped.push("this handler never runs");
            Ok(value)
        })
        .catch(move |error| {
            caught.push(format!("caught {error}"));
            Ok(0)
        })
        .finally(move || {
            cleanup.push("cleanup ran");
            Ok(())
        });

    let outcome = settled_value(event_loop, &result, Scenario::Recovery)?;
    log.push(format!("recovered with {outcome:?}"));
    Ok(())
}

fn all_scenario(event_loop: &mut EventLoop, log: &Log) -> CliResult<()> {
    let handle = event_loop.handle();
    let fulfilled = all(vec![
        delay(&handle, Duration::from_millis(30)).then(|_| Ok(1)),
        P::resolved(2),
        delay(&handle, Duration::from_millis(10)).then(|_| Ok(3)),
    ]);
    let outcome = settled_value(event_loop, &fulfilled, Scenario::All)?;
    log.push(format!("all fulfilled: {outcome:?}"));

    let rejected = all(vec![
        P::resolved(1),
        P::rejected(RuntimeError::custom("e")),
        P::resolved(3),
    ]);
    let outcome = settled_value(event_loop, &rejected, Scenario::All)?;
    log.push(format!("all with a rejection: {outcome:?}"));
    Ok(())
}

fn all_settled_scenario(event_loop: &mut EventLoop, log: &Log) -> CliResult<()> {
    let settled = all_settled(vec![P::resolved(1), P::rejected(RuntimeError::custom("e"))]);
    if let Ok(outcomes) = settled_value(event_loop, &settled, Scenario::AllSettled)? {
        log.push(serde_json::to_string(&outcomes)?);
    }
    Ok(())
}

fn race_scenario(event_loop: &mut EventLoop, log: &Log) -> CliResult<()> {
    let (never, _never_resolver) = P::<&'static str>::pending();
    let handle = event_loop.handle();
    let raced = race(vec![
        never,
        delay(&handle, Duration::from_millis(50)).then(|_| Ok("slow")),
        P::resolved("fast"),
    ]);

    let outcome = settled_value(event_loop, &raced, Scenario::Race)?;
    log.push(format!("race settled with {outcome:?}"));
    Ok(())
}

fn any_scenario(event_loop: &mut EventLoop, log: &Log) -> CliResult<()> {
    let first = any(vec![
        P::<i32>::rejected(RuntimeError::custom("mirror 1 down")),
        P::resolved(2),
    ]);
    let outcome = settled_value(event_loop, &first, Scenario::Any)?;
    log.push(format!("any fulfilled: {outcome:?}"));

    let none = any(vec![
        P::<i32>::rejected(RuntimeError::custom("mirror 1 down")),
        P::rejected(RuntimeError::custom("mirror 2 down")),
    ]);
    match settled_value(event_loop, &none, Scenario::Any)? {
        Ok(value) => log.push(format!("any fulfilled: {value}")),
        Err(error) => log.push(format!("{error}: {:?}", error.errors)),
    }
    Ok(())
}

fn timeout_scenario(event_loop: &mut EventLoop, log: &Log) -> CliResult<()> {
    let handle = event_loop.handle();
    let slow: P<&'static str> =
        delay(&handle, Duration::from_millis(500)).then(|_| Ok("report"));
    let guarded = timeout(
        &handle,
        &slow,
        Duration::from_millis(100),
        RuntimeError::timeout("report took longer than 100ms"),
    );

    match settled_value(event_loop, &guarded, Scenario::Timeout)? {
        Ok(value) => log.push(format!("got {value}")),
        Err(error) => log.push(format!(
            "gave up at {}ms: {error}",
            event_loop.now().as_millis()
        )),
    }

    event_loop.run_until_done()?;
    log.push(format!(
        "slow operation still finished at {}ms with {:?}",
        event_loop.now().as_millis(),
        slow.value()
    ));
    Ok(())
}

fn unhandled(event_loop: &mut EventLoop, log: &Log) -> CliResult<()> {
    let _forgotten: P<i32> =
        P::resolved(1).then(|_| Err(RuntimeError::type_error("handler failed")));
    log.push("handler failure left without a catch");

    event_loop.run_until_done()?;
    log.push("event loop kept running");
    Ok(())
}
