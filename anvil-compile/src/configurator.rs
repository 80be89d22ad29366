//! Per-spec customization of worker configuration

use anvil_execution::WorkerConfiguration;

use crate::spec::{GroovyCompileSpec, JavaCompileSpec, ScalaCompileSpec};

/// Adjusts the worker configuration of one compile unit
///
/// Called exactly once per `execute`, after the base parameters are set and
/// before the unit is submitted. Implementations only mutate `config`; they
/// must not submit work or block.
pub trait WorkerConfigurator<S>: Send + Sync {
    fn apply(&self, spec: &S, config: &mut WorkerConfiguration);
}

impl<S, F> WorkerConfigurator<S> for F
where
    F: Fn(&S, &mut WorkerConfiguration) + Send + Sync,
{
    fn apply(&self, spec: &S, config: &mut WorkerConfiguration) {
        self(spec, config)
    }
}

/// Leaves the configuration untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopConfigurator;

impl<S> WorkerConfigurator<S> for NoopConfigurator {
    fn apply(&self, _spec: &S, _config: &mut WorkerConfiguration) {}
}

/// Forwards the Java fork options to the worker process
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaWorkerConfigurator;

impl WorkerConfigurator<JavaCompileSpec> for JavaWorkerConfigurator {
    fn apply(&self, spec: &JavaCompileSpec, config: &mut WorkerConfiguration) {
        config
            .process
            .merge(&spec.compile_options.fork_options.to_process_options());
    }
}

/// Java fork options, Groovy fork options over them, and the Groovy classpath
#[derive(Debug, Clone, Copy, Default)]
pub struct GroovyWorkerConfigurator;

impl WorkerConfigurator<GroovyCompileSpec> for GroovyWorkerConfigurator {
    fn apply(&self, spec: &GroovyCompileSpec, config: &mut WorkerConfiguration) {
        JavaWorkerConfigurator.apply(&spec.java, config);
        if let Some(fork_options) = &spec.groovy_fork_options {
            config.process.merge(&fork_options.to_process_options());
        }
        config.add_classpath(spec.groovy_classpath.iter().cloned());
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScalaWorkerConfigurator;

impl WorkerConfigurator<ScalaCompileSpec> for ScalaWorkerConfigurator {
    fn apply(&self, spec: &ScalaCompileSpec, config: &mut WorkerConfiguration) {
        if let Some(fork_options) = &spec.scala_fork_options {
            config.process.merge(&fork_options.to_process_options());
        }
        config.add_classpath(spec.scala_classpath.iter().cloned());
        config.add_classpath(spec.compiler_classpath.iter().cloned());
    }
}
