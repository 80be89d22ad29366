//! Compile specs: immutable descriptions of one compilation

use std::collections::BTreeMap;
use std::path::PathBuf;

use anvil_execution::ProcessOptions;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Inputs and options of one compilation
///
/// Specs cross the worker boundary as data, so every spec type is a plain
/// serde value with no references to the submitting process.
pub trait CompileSpec: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Short description used in logs and worker display names
    fn display_name(&self) -> String;
}

/// Settings for a compiler running in a forked worker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForkOptions {
    pub memory_initial_size: Option<String>,
    pub memory_maximum_size: Option<String>,
    pub jvm_args: Vec<String>,
    pub environment: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
}

impl ForkOptions {
    pub fn to_process_options(&self) -> ProcessOptions {
        ProcessOptions {
            min_heap: self.memory_initial_size.clone(),
            max_heap: self.memory_maximum_size.clone(),
            args: self.jvm_args.clone(),
            environment: self.environment.clone(),
            working_dir: self.working_dir.clone(),
        }
    }
}

/// Options shared by the JVM compilers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub encoding: Option<String>,
    pub debug: bool,
    pub warnings: bool,
    pub compiler_args: Vec<String>,
    pub fork_options: ForkOptions,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            encoding: None,
            debug: true,
            warnings: true,
            compiler_args: Vec::new(),
            fork_options: ForkOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JavaCompileSpec {
    pub source_files: Vec<PathBuf>,
    pub destination_dir: PathBuf,
    #[serde(default)]
    pub classpath: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_compatibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_compatibility: Option<String>,
    #[serde(default)]
    pub compile_options: CompileOptions,
}

impl JavaCompileSpec {
    pub fn new(destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_files: Vec::new(),
            destination_dir: destination_dir.into(),
            classpath: Vec::new(),
            source_compatibility: None,
            target_compatibility: None,
            compile_options: CompileOptions::default(),
        }
    }

    pub fn with_sources<I>(mut self, sources: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<PathBuf>,
    {
        self.source_files.extend(sources.into_iter().map(Into::into));
        self
    }

    pub fn with_classpath<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<PathBuf>,
    {
        self.classpath.extend(entries.into_iter().map(Into::into));
        self
    }

    pub fn with_fork_options(mut self, fork_options: ForkOptions) -> Self {
        self.compile_options.fork_options = fork_options;
        self
    }
}

impl CompileSpec for JavaCompileSpec {
    fn display_name(&self) -> String {
        format!(
            "java compile of {} source(s) into {}",
            self.source_files.len(),
            self.destination_dir.display()
        )
    }
}

/// Joint Groovy/Java compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroovyCompileSpec {
    pub java: JavaCompileSpec,
    /// Groovy runtime and compiler jars loaded by the worker
    #[serde(default)]
    pub groovy_classpath: Vec<PathBuf>,
    /// Groovy-specific fork settings, layered over the Java ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groovy_fork_options: Option<ForkOptions>,
}

impl CompileSpec for GroovyCompileSpec {
    fn display_name(&self) -> String {
        format!(
            "groovy compile of {} source(s) into {}",
            self.java.source_files.len(),
            self.java.destination_dir.display()
        )
    }
}

/// Joint Scala/Java compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalaCompileSpec {
    pub java: JavaCompileSpec,
    /// Scala library jars
    #[serde(default)]
    pub scala_classpath: Vec<PathBuf>,
    /// Jars of the Scala compiler and its incremental driver
    #[serde(default)]
    pub compiler_classpath: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scala_fork_options: Option<ForkOptions>,
}

impl CompileSpec for ScalaCompileSpec {
    fn display_name(&self) -> String {
        format!(
            "scala compile of {} source(s) into {}",
            self.java.source_files.len(),
            self.java.destination_dir.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_java_spec_builder() {
        let spec = JavaCompileSpec::new("build/classes/java/main")
            .with_sources(["src/main/java/App.java", "src/main/java/Util.java"])
            .with_classpath(["libs/guava.jar"]);

        assert_eq!(spec.source_files.len(), 2);
        assert_eq!(spec.classpath, vec![PathBuf::from("libs/guava.jar")]);
        assert_eq!(
            spec.display_name(),
            "java compile of 2 source(s) into build/classes/java/main"
        );
    }

    #[test]
    fn test_spec_decodes_with_defaults() {
        let spec: JavaCompileSpec = serde_json::from_value(json!({
            "source_files": ["A.java"],
            "destination_dir": "out",
        }))
        .unwrap();

        assert!(spec.classpath.is_empty());
        assert!(spec.compile_options.debug);
        assert!(spec.compile_options.fork_options.jvm_args.is_empty());
    }

    #[test]
    fn test_fork_options_to_process_options() {
        let fork = ForkOptions {
            memory_initial_size: Some("128m".to_string()),
            memory_maximum_size: Some("1g".to_string()),
            jvm_args: vec!["-XX:+UseParallelGC".to_string()],
            ..Default::default()
        };

        let options = fork.to_process_options();
        assert_eq!(options.min_heap.as_deref(), Some("128m"));
        assert_eq!(options.max_heap.as_deref(), Some("1g"));
        assert_eq!(options.args, vec!["-XX:+UseParallelGC".to_string()]);
        assert!(ForkOptions::default().to_process_options().is_default());
    }
}
