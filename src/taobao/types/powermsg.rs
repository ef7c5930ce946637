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

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_aux::prelude::*;

use crate::taobao::{
	mtop::{MtopClient, MtopResponse, POWERMSG_PULL},
	Error
};

const SDK_VERSION: &str = "h5_3.4.2";

#[derive(Serialize, Debug)]
pub struct PullNativeMsgRequest<'a> {
	topic: &'a str,
	offset: &'a str,
	pagesize: u32,
	tag: &'static str,
	bizcode: u32,
	sdkversion: &'static str,
	role: u32
}

impl<'a> PullNativeMsgRequest<'a> {
	pub(crate) fn new(topic: &'a str, offset: &'a str) -> Self {
		Self {
			topic,
			offset,
			pagesize: 10,
			tag: "",
			bizcode: 1,
			sdkversion: SDK_VERSION,
			role: 3
		}
	}
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PullNativeMsg {
	pub timestamp_list: Vec<TimestampEntry>
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct TimestampEntry {
	#[serde(deserialize_with = "deserialize_string_from_number")]
	pub offset: String
}

impl PullNativeMsg {
	/// Sends one keep-alive pull. Unlike other calls, a non-success `ret` isn't an error here; the caller reports it.
	pub(crate) async fn pull(mtop: &MtopClient, topic: &str, offset: &str, referer: &str) -> Result<MtopResponse<Self>, Error> {
		let mut headers = HeaderMap::new();
		headers.insert("x-biz-type", HeaderValue::from_static("powermsg"));
		headers.insert("x-biz-info", HeaderValue::from_static("namespace=1"));
		if let Ok(referer) = HeaderValue::from_str(referer) {
			headers.insert(header::REFERER, referer);
		}
		mtop.call_raw(&POWERMSG_PULL, &PullNativeMsgRequest::new(topic, offset), headers).await
	}

	pub fn last_offset(&self) -> Option<&str> {
		self.timestamp_list.last().map(|entry| entry.offset.as_str()).filter(|offset| !offset.is_empty())
	}
}
