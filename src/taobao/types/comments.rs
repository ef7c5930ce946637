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

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_aux::prelude::*;
use simd_json::OwnedValue;

use crate::taobao::{
	mtop::{MtopClient, COMMENTS},
	Error
};

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QueryLatestRequest<'a> {
	topic: &'a str,
	limit: u32,
	tab: u32,
	order: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pagination_context: Option<&'a OwnedValue>
}

impl<'a> QueryLatestRequest<'a> {
	pub(crate) fn new(topic: &'a str, limit: u32, pagination_context: Option<&'a OwnedValue>) -> Self {
		Self {
			topic,
			limit,
			tab: 2,
			order: "asc",
			pagination_context
		}
	}
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CommentPage {
	pub comments: Vec<Comment>,
	/// Opaque cursor; must be echoed back verbatim on the next poll.
	pub pagination_context: Option<OwnedValue>,
	/// Milliseconds the server asks us to wait before polling again.
	#[serde(deserialize_with = "deserialize_option_number_from_string")]
	pub delay: Option<u64>
}

impl CommentPage {
	pub(crate) async fn fetch(mtop: &MtopClient, topic: &str, limit: u32, pagination_context: Option<&OwnedValue>) -> Result<Self, Error> {
		mtop.call(&COMMENTS, &QueryLatestRequest::new(topic, limit, pagination_context), HeaderMap::new())
			.await
	}

	pub fn delay_or(&self, fallback: Duration) -> Duration {
		self.delay.map_or(fallback, Duration::from_millis)
	}
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct Comment {
	#[serde(deserialize_with = "deserialize_string_from_number")]
	pub comment_id: String,
	pub publisher_nick: String,
	#[serde(deserialize_with = "deserialize_string_from_number")]
	pub publisher_id: String,
	pub content: String,
	#[serde(deserialize_with = "deserialize_option_number_from_string")]
	pub timestamp: Option<i64>
}
