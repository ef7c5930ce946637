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

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_aux::prelude::*;

use crate::taobao::{
	mtop::{MtopClient, LIVE_DETAIL},
	Error
};

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LiveDetailRequest<'a> {
	live_id: &'a str
}

/// The room detail record. Every field is optional; the gateway omits whatever the viewer isn't allowed to see.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveDetail {
	pub topic: Option<String>,
	pub title: Option<String>,
	#[serde(deserialize_with = "deserialize_option_number_from_string")]
	pub room_status: Option<i64>,
	pub broad_caster: Option<Broadcaster>,
	#[serde(deserialize_with = "deserialize_option_number_from_string")]
	pub online_count: Option<u64>,
	#[serde(deserialize_with = "deserialize_option_number_from_string")]
	pub view_count: Option<u64>,
	#[serde(deserialize_with = "deserialize_option_number_from_string")]
	pub total_join_count: Option<u64>,
	#[serde(deserialize_with = "deserialize_option_number_from_string")]
	pub praise_count: Option<u64>
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct Broadcaster {
	pub account_name: Option<String>
}

impl LiveDetail {
	pub(crate) async fn fetch(mtop: &MtopClient, live_id: &str) -> Result<Self, Error> {
		mtop.call(&LIVE_DETAIL, &LiveDetailRequest { live_id }, HeaderMap::new()).await
	}

	/// Cumulative number of viewers who have entered the room.
	pub fn join_count(&self) -> Option<u64> {
		self.total_join_count.or(self.view_count)
	}
}
