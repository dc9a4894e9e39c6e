//! Local chain node lifecycle
//!
//! Spawns a local development node (anvil by default), waits until its
//! JSON-RPC endpoint answers `eth_chainId`, and tears it down again. Node
//! startup is flaky on loaded CI machines (port races, slow first boot), so
//! both the spawn and the readiness probe run under a [`RetryStrategy`].

use std::net::TcpListener;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::retry::{RetryPolicy, RetryStrategy};

const DEFAULT_CHAIN_ID: u64 = 31337;

/// Local node launch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeConfig {
	/// Node executable, resolved through `PATH` when relative.
	pub binary: PathBuf,
	/// Host the node binds to.
	pub host: String,
	/// Port to listen on; `0` picks a free port per startup attempt.
	pub port: u16,
	/// Chain id the node must report.
	pub chain_id: u64,
	/// Upstream RPC to fork from.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub fork_url: Option<String>,
	/// Block to fork at (requires `fork_url`).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub fork_block_number: Option<u64>,
	/// Interval mining in seconds; instant mining when unset.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub block_time: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub mnemonic: Option<String>,
	/// Number of funded dev accounts.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub accounts: Option<u32>,
	/// Extra arguments appended verbatim.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub extra_args: Vec<String>,
	/// Spawn attempts, each on a fresh port when `port` is `0`.
	pub startup: RetryPolicy,
	/// Readiness probes per spawn attempt.
	pub readiness: RetryPolicy,
}

impl Default for NodeConfig {
	fn default() -> Self {
		Self {
			binary: PathBuf::from("anvil"),
			host: "127.0.0.1".to_string(),
			port: 0,
			chain_id: DEFAULT_CHAIN_ID,
			fork_url: None,
			fork_block_number: None,
			block_time: None,
			mnemonic: None,
			accounts: None,
			extra_args: Vec::new(),
			startup: RetryPolicy {
				base_delay: Duration::from_millis(500),
				max_delay: Duration::from_secs(5),
				multiplier: 2.0,
				jitter: true,
				max_attempts: 3,
			},
			readiness: RetryPolicy {
				base_delay: Duration::from_millis(100),
				max_delay: Duration::from_secs(1),
				multiplier: 1.5,
				jitter: false,
				max_attempts: 20,
			},
		}
	}
}

impl NodeConfig {
	/// Command-line arguments for a node listening on `port`.
	pub fn args(&self, port: u16) -> Vec<String> {
		let mut args = vec![
			"--host".to_string(),
			self.host.clone(),
			"--port".to_string(),
			port.to_string(),
			"--chain-id".to_string(),
			self.chain_id.to_string(),
		];

		if let Some(fork_url) = &self.fork_url {
			args.push("--fork-url".to_string());
			args.push(fork_url.clone());
			if let Some(block) = self.fork_block_number {
				args.push("--fork-block-number".to_string());
				args.push(block.to_string());
			}
		}
		if let Some(block_time) = self.block_time {
			args.push("--block-time".to_string());
			args.push(block_time.to_string());
		}
		if let Some(mnemonic) = &self.mnemonic {
			args.push("--mnemonic".to_string());
			args.push(mnemonic.clone());
		}
		if let Some(accounts) = self.accounts {
			args.push("--accounts".to_string());
			args.push(accounts.to_string());
		}

		args.extend(self.extra_args.iter().cloned());
		args
	}

	/// Checks both retry policies.
	pub fn validate(&self) -> Result<()> {
		self.startup.validate()?;
		self.readiness.validate()
	}
}

/// A running local chain node.
///
/// The child process is killed when this value is dropped; call
/// [`stop`](Self::stop) to wait for it to exit.
#[derive(Debug)]
pub struct LocalNode {
	process: Child,
	port: u16,
	rpc_url: String,
	client: reqwest::Client,
}

impl LocalNode {
	/// Starts a node and waits until it serves JSON-RPC.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidPolicy`] for a broken configuration,
	/// [`Error::ChainIdMismatch`] as soon as a spawned node answers on the
	/// wrong chain, and [`Error::NodeNotReady`] when every startup attempt
	/// failed.
	pub async fn start(config: NodeConfig) -> Result<Self> {
		config.validate()?;

		let client = reqwest::Client::builder().timeout(Duration::from_secs(5)).build()?;
		let startup = RetryStrategy::new(config.startup);
		let (config_ref, client_ref) = (&config, &client);

		let node = startup
			.execute_with(
				// A node on the wrong chain will not fix itself on respawn.
				move || async move {
					match Self::start_once(config_ref, client_ref).await {
						Err(err @ Error::ChainIdMismatch { .. }) => Ok(Err(err)),
						other => other.map(Ok),
					}
				},
				|attempt| {
					warn!(
						target = "testkit",
						attempt = attempt.index,
						delay_ms = attempt.delay.as_millis() as u64,
						error = %attempt.error,
						"local node startup failed, retrying"
					)
				},
			)
			.await
			.map_err(|failure| Error::NodeNotReady {
				attempts: failure.attempts,
				source: Box::new(failure.last),
			})??;

		info!(target = "testkit", port = node.port, url = %node.rpc_url, "local node ready");
		Ok(node)
	}

	async fn start_once(config: &NodeConfig, client: &reqwest::Client) -> Result<Self> {
		let port = if config.port == 0 { free_port(&config.host)? } else { config.port };

		let mut process = Command::new(&config.binary)
			.args(config.args(port))
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| Error::NodeLaunch(format!("failed to spawn {}: {e}", config.binary.display())))?;

		debug!(target = "testkit", port, binary = %config.binary.display(), "spawned local node");

		// Catch immediate exits (bad flags, port already bound) before probing.
		tokio::time::sleep(Duration::from_millis(100)).await;
		if let Some(status) = process.try_wait()? {
			return Err(Error::NodeLaunch(format!("node process exited immediately with status: {status}")));
		}

		let rpc_url = format!("http://{}:{port}", config.host);
		match wait_until_ready(client, &rpc_url, config.chain_id, config.readiness).await {
			Ok(()) => Ok(Self {
				process,
				port,
				rpc_url,
				client: client.clone(),
			}),
			Err(err) => {
				let _ = process.kill().await;
				Err(err)
			}
		}
	}

	pub fn port(&self) -> u16 {
		self.port
	}

	pub fn rpc_url(&self) -> &str {
		&self.rpc_url
	}

	/// Sends a JSON-RPC request to the node.
	pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
		let result = rpc_call(&self.client, &self.rpc_url, method, params).await?;
		Ok(serde_json::from_value(result)?)
	}

	pub async fn chain_id(&self) -> Result<u64> {
		let hex: String = self.request("eth_chainId", Value::Array(Vec::new())).await?;
		parse_quantity(&hex)
	}

	/// Kills the node and waits briefly for it to exit.
	pub async fn stop(mut self) -> Result<()> {
		self.process
			.kill()
			.await
			.map_err(|e| Error::NodeLaunch(format!("failed to kill node process: {e}")))?;
		let _ = tokio::time::timeout(Duration::from_millis(500), self.process.wait()).await;
		info!(target = "testkit", port = self.port, "local node stopped");
		Ok(())
	}
}

/// Polls `eth_chainId` at `url` until it answers with `chain_id`.
///
/// A mismatching chain id is reported once the endpoint answers; it is not
/// retried.
///
/// # Errors
///
/// Returns [`Error::ChainIdMismatch`] or [`Error::NodeUnresponsive`].
pub async fn wait_until_ready(client: &reqwest::Client, url: &str, chain_id: u64, policy: RetryPolicy) -> Result<()> {
	let readiness = RetryStrategy::new(policy);
	let actual = readiness
		.execute(move || async move {
			let result = rpc_call(client, url, "eth_chainId", Value::Array(Vec::new())).await?;
			let hex = result
				.as_str()
				.ok_or_else(|| Error::Rpc {
					code: 0,
					message: format!("eth_chainId returned non-string result: {result}"),
				})?
				.to_string();
			parse_quantity(&hex)
		})
		.await
		.map_err(|failure| Error::NodeUnresponsive {
			port: port_of(url),
			attempts: failure.attempts,
			source: Box::new(failure.last),
		})?;

	if actual != chain_id {
		return Err(Error::ChainIdMismatch { expected: chain_id, actual });
	}
	Ok(())
}

#[derive(Serialize)]
struct RpcRequest<'a> {
	jsonrpc: &'static str,
	id: u64,
	method: &'a str,
	params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
	#[serde(default)]
	result: Option<Value>,
	#[serde(default)]
	error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
	code: i64,
	message: String,
}

/// Sends one JSON-RPC 2.0 request and returns its `result`.
pub async fn rpc_call(client: &reqwest::Client, url: &str, method: &str, params: Value) -> Result<Value> {
	let request = RpcRequest {
		jsonrpc: "2.0",
		id: 1,
		method,
		params,
	};

	let response: RpcResponse = client.post(url).json(&request).send().await?.error_for_status()?.json().await?;

	if let Some(error) = response.error {
		return Err(Error::Rpc {
			code: error.code,
			message: error.message,
		});
	}
	Ok(response.result.unwrap_or(Value::Null))
}

/// Parses a `0x`-prefixed hex quantity.
pub fn parse_quantity(hex: &str) -> Result<u64> {
	let digits = hex.strip_prefix("0x").unwrap_or(hex);
	u64::from_str_radix(digits, 16).map_err(|e| Error::Rpc {
		code: 0,
		message: format!("invalid hex quantity {hex:?}: {e}"),
	})
}

/// Asks the OS for an unused TCP port on `host`.
pub fn free_port(host: &str) -> Result<u16> {
	let listener = TcpListener::bind((host, 0))?;
	Ok(listener.local_addr()?.port())
}

fn port_of(url: &str) -> u16 {
	url.rsplit(':')
		.next()
		.and_then(|tail| tail.trim_end_matches('/').parse().ok())
		.unwrap_or(0)
}
