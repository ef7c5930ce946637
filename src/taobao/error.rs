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

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("Invalid Taobao Live ID or URL: {0}")]
	InvalidLiveId(String),
	#[error("Room {0} did not report a message topic")]
	MissingTopic(String),
	#[error("Missing `_m_h5_tk` or `_m_h5_tk_enc` session cookie")]
	MissingToken,
	#[error("mtop call to {api} failed: {ret}")]
	Mtop { api: &'static str, ret: String },
	#[error("response is not a JSONP payload")]
	MalformedJsonp,
	#[error("error when deserializing: {0}")]
	Deserialization(#[from] simd_json::Error),
	#[error("request timed out")]
	TimedOut,
	#[error("request returned bad HTTP status: {0}")]
	BadStatus(StatusCode),
	#[error("request error: {0}")]
	GeneralRequest(reqwest::Error),
	#[error("Error parsing URL: {0}")]
	URLParseError(#[from] url::ParseError)
}

impl Error {
	pub fn is_fatal(&self) -> bool {
		!matches!(self, Error::TimedOut)
	}
}

impl From<reqwest::Error> for Error {
	fn from(value: reqwest::Error) -> Self {
		if value.is_timeout() {
			Error::TimedOut
		} else if let Some(status) = value.status() {
			Error::BadStatus(status)
		} else {
			Error::GeneralRequest(value)
		}
	}
}
