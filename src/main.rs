// Copyright 2025 pyke.io
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// 	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use futures_util::StreamExt;
use taolive::taobao::{self, ChatContext, ChatOptions, Credentials, Status};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taolive", version, about = "Listen to a Taobao Live room's chat")]
struct Cli {
	/// Live room ID or URL, e.g. 518876609326 or https://tbzb.taobao.com/live?liveId=518876609326
	#[arg(env = "TAOLIVE_LIVE_ID")]
	live: String,

	/// Message topic captured from a browser session; skips the handshake
	#[arg(long, requires = "m_h5_tk")]
	topic: Option<String>,

	/// Value of the `_m_h5_tk` cookie
	#[arg(long, requires = "m_h5_tk_enc")]
	m_h5_tk: Option<String>,

	/// Value of the `_m_h5_tk_enc` cookie
	#[arg(long, requires = "topic")]
	m_h5_tk_enc: Option<String>,

	/// Seconds between heartbeats
	#[arg(long, default_value_t = 10)]
	heartbeat_interval: u64,

	/// Seconds between statistics samples; 0 disables statistics and entry events
	#[arg(long, default_value_t = 30)]
	stats_interval: u64,

	/// Print the room status and exit
	#[arg(long)]
	status: bool,

	/// Print one JSON object per event instead of log lines
	#[arg(long)]
	json: bool
}

impl Cli {
	fn options(&self) -> ChatOptions {
		ChatOptions {
			heartbeat_interval: Duration::from_secs(self.heartbeat_interval.max(1)),
			statistics_interval: (self.stats_interval > 0).then(|| Duration::from_secs(self.stats_interval)),
			..Default::default()
		}
	}

	async fn context(&self) -> Result<ChatContext, taobao::Error> {
		match (&self.topic, &self.m_h5_tk, &self.m_h5_tk_enc) {
			(Some(topic), Some(m_h5_tk), Some(m_h5_tk_enc)) => ChatContext::with_credentials(
				&self.live,
				topic,
				Credentials {
					m_h5_tk: m_h5_tk.clone(),
					m_h5_tk_enc: m_h5_tk_enc.clone()
				},
				self.options()
			),
			_ => ChatContext::new_from_live_with_options(&self.live, self.options()).await
		}
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
		.with_writer(std::io::stderr)
		.init();

	let cli = Cli::parse();

	println!("{}", Status::Info(format!("正在获取直播间参数: {}", cli.live)));
	let context = match cli.context().await {
		Ok(context) => context,
		Err(e) => {
			println!("{}", Status::Failure(format!("获取直播间参数失败: {e}")));
			return Err(e).context("failed to establish session");
		}
	};
	println!("{}", Status::Success(format!("成功获取直播间参数: topic={}", context.topic())));

	if cli.status {
		let status = context.room_status().await?;
		println!("{}", Status::Info(format!("直播间ID: {}", status.live_id)));
		if let Some(title) = &status.title {
			println!("{}", Status::Info(format!("标题: {title}")));
		}
		if let Some(anchor) = &status.anchor {
			println!("{}", Status::Info(format!("主播: {anchor}")));
		}
		if let Some(state) = status.state {
			println!("{}", Status::Info(format!("状态: {state}")));
		}
		println!("{}", taobao::Event::Statistics(status.statistics));
		return Ok(());
	}

	let mut stream = taobao::stream(&context).await?;
	println!("{}", Status::Info("监听已启动。按 Ctrl+C 停止。".to_string()));
	loop {
		tokio::select! {
			event = stream.next() => match event {
				Some(Ok(event)) => {
					if cli.json {
						println!("{}", simd_json::to_string(&event)?);
					} else {
						println!("{event}");
					}
				}
				Some(Err(e)) => println!("{}", Status::Failure(e.to_string())),
				None => {
					println!("{}", Status::Failure("连接已断开".to_string()));
					break;
				}
			},
			_ = tokio::signal::ctrl_c() => {
				println!("\n{}", Status::Info("收到 Ctrl+C，正在停止...".to_string()));
				break;
			}
		}
	}

	drop(stream);
	println!("{}", Status::Info("已停止。".to_string()));
	Ok(())
}
