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

use std::{fmt, sync::OnceLock, time::Duration};

use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use super::{
	mtop::{Credentials, MtopClient, TOKEN_COOKIE, TOKEN_ENC_COOKIE},
	types::LiveDetail,
	Error, RoomStatistics, H5API_BASE, LIVE_PAGE_BASE, USER_AGENT
};
use crate::util::MapNonempty;

/// Tunables for a chat session. The defaults mirror what the H5 web client does.
#[derive(Debug, Clone)]
pub struct ChatOptions {
	/// Base URL of the mtop gateway; API paths are joined onto it, so it must end with `/`.
	pub h5api_base: String,
	/// The live room page, used to seed cookies and as the heartbeat referer.
	pub live_page_base: String,
	pub user_agent: String,
	pub request_timeout: Duration,
	/// Comments requested per poll.
	pub page_size: u32,
	pub heartbeat_interval: Duration,
	/// How often to sample room statistics. `None` disables statistics and entry events.
	pub statistics_interval: Option<Duration>,
	/// Delay between comment polls when the server doesn't specify one.
	pub default_poll_delay: Duration
}

impl Default for ChatOptions {
	fn default() -> Self {
		Self {
			h5api_base: H5API_BASE.to_string(),
			live_page_base: LIVE_PAGE_BASE.to_string(),
			user_agent: USER_AGENT.to_string(),
			request_timeout: Duration::from_secs(10),
			page_size: 20,
			heartbeat_interval: Duration::from_secs(10),
			statistics_interval: Some(Duration::from_secs(30)),
			default_poll_delay: Duration::from_millis(6000)
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
	Upcoming,
	Live,
	Ended,
	Unknown(i64)
}

impl From<i64> for RoomState {
	fn from(value: i64) -> Self {
		match value {
			0 => RoomState::Upcoming,
			1 => RoomState::Live,
			2 => RoomState::Ended,
			n => RoomState::Unknown(n)
		}
	}
}

impl fmt::Display for RoomState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RoomState::Upcoming => f.write_str("未开播"),
			RoomState::Live => f.write_str("直播中"),
			RoomState::Ended => f.write_str("已结束"),
			RoomState::Unknown(n) => write!(f, "未知 ({n})")
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomStatus {
	pub live_id: String,
	pub title: Option<String>,
	pub anchor: Option<String>,
	pub state: Option<RoomState>,
	pub statistics: RoomStatistics
}

impl RoomStatus {
	pub(crate) fn from_detail(live_id: &str, detail: &LiveDetail) -> Self {
		Self {
			live_id: live_id.to_string(),
			title: detail.title.clone(),
			anchor: detail.broad_caster.as_ref().and_then(|b| b.account_name.clone()),
			state: detail.room_status.map(RoomState::from),
			statistics: RoomStatistics::from(detail)
		}
	}
}

/// Session material for one live room: its message topic and an HTTP client holding the room's session cookies.
#[derive(Debug, Clone)]
pub struct ChatContext {
	pub(crate) live_id: String,
	pub(crate) topic: String,
	pub(crate) mtop: MtopClient,
	pub(crate) options: ChatOptions
}

impl ChatContext {
	/// Resolves a live room and performs the session handshake.
	///
	/// ```no_run
	/// use taolive::taobao::ChatContext;
	///
	/// # #[tokio::main]
	/// # async fn main() -> anyhow::Result<()> {
	/// let context = ChatContext::new_from_live("https://tbzb.taobao.com/live?liveId=518876609326").await?;
	/// println!("topic: {}", context.topic());
	/// # Ok(())
	/// # }
	/// ```
	pub async fn new_from_live(id: impl AsRef<str>) -> Result<Self, Error> {
		Self::new_from_live_with_options(id, ChatOptions::default()).await
	}

	pub async fn new_from_live_with_options(id: impl AsRef<str>, options: ChatOptions) -> Result<Self, Error> {
		let live_id = Self::parse_live_id(id.as_ref())?;
		let mtop = MtopClient::new(&options)?;

		// The page itself hands out the tracking cookies a browser would carry into the first mtop call.
		let page = live_page_url(&options, &live_id)?;
		debug!(%page, "visiting live page");
		if let Err(e) = mtop.http().get(page).send().await.and_then(|r| r.error_for_status()) {
			warn!("live page visit failed, continuing without page cookies: {e}");
		}

		let detail = LiveDetail::fetch(&mtop, &live_id).await?;
		let topic = detail.topic.and_then_nonempty(Some).ok_or_else(|| Error::MissingTopic(live_id.clone()))?;
		if mtop.credentials().is_none() {
			return Err(Error::MissingToken);
		}
		debug!(%live_id, %topic, "session established");

		Ok(Self { live_id, topic, mtop, options })
	}

	/// Builds a context from session material captured elsewhere, e.g. a real browser session, skipping the handshake.
	pub fn with_credentials(id: impl AsRef<str>, topic: impl Into<String>, credentials: Credentials, options: ChatOptions) -> Result<Self, Error> {
		let live_id = Self::parse_live_id(id.as_ref())?;
		let topic = topic.into().and_then_nonempty(Some).ok_or_else(|| Error::MissingTopic(live_id.clone()))?;
		if credentials.m_h5_tk.is_empty() || credentials.m_h5_tk_enc.is_empty() {
			return Err(Error::MissingToken);
		}
		let mtop = MtopClient::new(&options)?;
		mtop.set_cookie(TOKEN_COOKIE, &credentials.m_h5_tk);
		mtop.set_cookie(TOKEN_ENC_COOKIE, &credentials.m_h5_tk_enc);
		Ok(Self { live_id, topic, mtop, options })
	}

	/// Extracts the numeric room ID from either a bare ID or a live room URL.
	pub fn parse_live_id(input: &str) -> Result<String, Error> {
		let input = input.trim();
		if !input.is_empty() && input.bytes().all(|c| c.is_ascii_digit()) {
			return Ok(input.to_string());
		}

		static LIVE_ID_RE: OnceLock<Regex> = OnceLock::new();
		if input.contains("taobao.com") {
			if let Some(id) = LIVE_ID_RE
				.get_or_init(|| Regex::new(r#"[?&#]liveId=(\d+)"#).unwrap())
				.captures(input)
				.and_then(|c| c.get(1))
			{
				return Ok(id.as_str().to_string());
			}
		}
		Err(Error::InvalidLiveId(input.to_string()))
	}

	/// Queries the room's current detail record.
	pub async fn room_status(&self) -> Result<RoomStatus, Error> {
		let detail = LiveDetail::fetch(&self.mtop, &self.live_id).await?;
		Ok(RoomStatus::from_detail(&self.live_id, &detail))
	}

	pub fn id(&self) -> &str {
		&self.live_id
	}

	pub fn topic(&self) -> &str {
		&self.topic
	}

	pub fn url(&self) -> Result<Url, Error> {
		live_page_url(&self.options, &self.live_id)
	}

	/// The session cookies currently held by this context; these change whenever the gateway refreshes the token.
	pub fn credentials(&self) -> Option<Credentials> {
		self.mtop.credentials()
	}

	pub fn options(&self) -> &ChatOptions {
		&self.options
	}
}

fn live_page_url(options: &ChatOptions, live_id: &str) -> Result<Url, Error> {
	Ok(Url::parse_with_params(&options.live_page_base, [("liveId", live_id)])?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::taobao::types::Broadcaster;

	#[test]
	fn parses_ids_and_urls() {
		assert_eq!(ChatContext::parse_live_id("518876609326").unwrap(), "518876609326");
		assert_eq!(ChatContext::parse_live_id(" 525338516315\n").unwrap(), "525338516315");
		assert_eq!(ChatContext::parse_live_id("https://tbzb.taobao.com/live?liveId=518876609326").unwrap(), "518876609326");
		assert_eq!(ChatContext::parse_live_id("https://tbzb.taobao.com/live?spm=a1z9u.8142865&liveId=42&x=1").unwrap(), "42");
	}

	#[test]
	fn rejects_bad_ids() {
		for input in ["", "abc", "https://tbzb.taobao.com/live", "https://example.com/?liveId=1", "12a"] {
			assert!(matches!(ChatContext::parse_live_id(input), Err(Error::InvalidLiveId(_))), "{input}");
		}
	}

	#[test]
	fn credentials_context_skips_handshake() {
		let context = ChatContext::with_credentials(
			"518876609326",
			"topic-1",
			Credentials {
				m_h5_tk: "abc_1".to_string(),
				m_h5_tk_enc: "enc".to_string()
			},
			ChatOptions::default()
		)
		.unwrap();
		assert_eq!(context.id(), "518876609326");
		assert_eq!(context.topic(), "topic-1");
		assert_eq!(context.credentials().unwrap().token(), "abc");
		assert_eq!(context.url().unwrap().as_str(), "https://tbzb.taobao.com/live?liveId=518876609326");
	}

	#[test]
	fn credentials_context_requires_material() {
		let empty = Credentials {
			m_h5_tk: String::new(),
			m_h5_tk_enc: "enc".to_string()
		};
		assert!(matches!(ChatContext::with_credentials("1", "t", empty, ChatOptions::default()), Err(Error::MissingToken)));
		let credentials = Credentials {
			m_h5_tk: "a_1".to_string(),
			m_h5_tk_enc: "enc".to_string()
		};
		assert!(matches!(ChatContext::with_credentials("1", "", credentials, ChatOptions::default()), Err(Error::MissingTopic(_))));
	}

	#[test]
	fn room_status_from_detail() {
		let detail = LiveDetail {
			title: Some("夏季新品".to_string()),
			room_status: Some(1),
			broad_caster: Some(Broadcaster { account_name: Some("店铺".to_string()) }),
			online_count: Some(7),
			..Default::default()
		};
		let status = RoomStatus::from_detail("9", &detail);
		assert_eq!(status.state, Some(RoomState::Live));
		assert_eq!(status.anchor.as_deref(), Some("店铺"));
		assert_eq!(status.statistics.online, Some(7));
		assert_eq!(RoomState::from(5).to_string(), "未知 (5)");
	}
}
