//! Typed view over the subset of DAP commands and events used by the adapter.
//!
//! Session engine is name generic, these definitions let call sites stay
//! statically checked. See [`crate::dap::api::DapApi::request_typed`],
//! [`crate::dap::api::DapApi::emit`] and [`crate::dap::api::DapApi::on_typed`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// DAP request with its arguments and response body types.
pub trait Command {
    const COMMAND: &'static str;
    type Arguments: Serialize + DeserializeOwned + Send + 'static;
    type Response: Serialize + DeserializeOwned + Send + 'static;
}

/// DAP event with its body type.
pub trait Notification {
    const EVENT: &'static str;
    type Body: Serialize + DeserializeOwned;
}

/// Arguments (or body) without fields, serialized as `{}`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Empty {}

// --------------------------------- requests --------------------------------------------------

pub struct Initialize;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeArguments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(rename = "adapterID")]
    pub adapter_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_start_at1: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns_start_at1: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_format: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_configuration_done_request: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_evaluate_for_hovers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_terminate_request: Option<bool>,
}

impl Command for Initialize {
    const COMMAND: &'static str = "initialize";
    type Arguments = InitializeArguments;
    type Response = Capabilities;
}

pub struct ConfigurationDone;

impl Command for ConfigurationDone {
    const COMMAND: &'static str = "configurationDone";
    type Arguments = Empty;
    type Response = ();
}

pub struct Evaluate;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateArguments {
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    pub result: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub variables_reference: i64,
}

impl Command for Evaluate {
    const COMMAND: &'static str = "evaluate";
    type Arguments = EvaluateArguments;
    type Response = EvaluateResponse;
}

pub struct Pause;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadArguments {
    pub thread_id: i64,
}

impl Command for Pause {
    const COMMAND: &'static str = "pause";
    type Arguments = ThreadArguments;
    type Response = ();
}

pub struct Threads;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadsResponse {
    pub threads: Vec<Thread>,
}

impl Command for Threads {
    const COMMAND: &'static str = "threads";
    type Arguments = Empty;
    type Response = ThreadsResponse;
}

pub struct Continue;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueArguments {
    pub thread_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_thread: Option<bool>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_threads_continued: Option<bool>,
}

impl Command for Continue {
    const COMMAND: &'static str = "continue";
    type Arguments = ContinueArguments;
    type Response = ContinueResponse;
}

pub struct Disconnect;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectArguments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminate_debuggee: Option<bool>,
}

impl Command for Disconnect {
    const COMMAND: &'static str = "disconnect";
    type Arguments = DisconnectArguments;
    type Response = ();
}

// --------------------------------- events ----------------------------------------------------

pub struct Initialized;

impl Notification for Initialized {
    const EVENT: &'static str = "initialized";
    type Body = Empty;
}

pub struct Output;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEventBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub output: String,
}

impl Notification for Output {
    const EVENT: &'static str = "output";
    type Body = OutputEventBody;
}

pub struct Stopped;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedEventBody {
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_threads_stopped: Option<bool>,
}

impl Notification for Stopped {
    const EVENT: &'static str = "stopped";
    type Body = StoppedEventBody;
}

pub struct Terminated;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminatedEventBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<Value>,
}

impl Notification for Terminated {
    const EVENT: &'static str = "terminated";
    type Body = TerminatedEventBody;
}

pub struct Exited;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitedEventBody {
    pub exit_code: i64,
}

impl Notification for Exited {
    const EVENT: &'static str = "exited";
    type Body = ExitedEventBody;
}
