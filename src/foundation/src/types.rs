//
// Copyright (c) 2025 Contributors to the Eclipse Foundation
//
// See the NOTICE file(s) distributed with this work for additional
// information regarding copyright ownership.
//
// This program and the accompanying materials are made available under the
// terms of the Apache License Version 2.0 which is available at
// <https://www.apache.org/licenses/LICENSE-2.0>
//
// SPDX-License-Identifier: Apache-2.0
//

use ::core::fmt;

/// Failures of the event loop machinery that are not tied to a transport.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommonErrors {
    GenericError,
    NoSpaceLeft,
    WrongArgs,
    NotSupported,
}

impl fmt::Display for CommonErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CommonErrors::GenericError => "generic error",
            CommonErrors::NoSpaceLeft => "no space left",
            CommonErrors::WrongArgs => "wrong arguments",
            CommonErrors::NotSupported => "not supported",
        };
        f.write_str(text)
    }
}

impl std::error::Error for CommonErrors {}

impl From<CommonErrors> for std::io::Error {
    fn from(err: CommonErrors) -> Self {
        std::io::Error::from(match err {
            CommonErrors::GenericError => std::io::ErrorKind::Other,
            CommonErrors::NoSpaceLeft => std::io::ErrorKind::OutOfMemory,
            CommonErrors::WrongArgs => std::io::ErrorKind::InvalidInput,
            CommonErrors::NotSupported => std::io::ErrorKind::Unsupported,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_errors_map_to_io_kinds() {
        assert_eq!(std::io::Error::from(CommonErrors::NoSpaceLeft).kind(), std::io::ErrorKind::OutOfMemory);
        assert_eq!(std::io::Error::from(CommonErrors::WrongArgs).kind(), std::io::ErrorKind::InvalidInput);
        assert_eq!(std::io::Error::from(CommonErrors::NotSupported).kind(), std::io::ErrorKind::Unsupported);
    }

    #[test]
    fn common_errors_display() {
        assert_eq!(CommonErrors::NoSpaceLeft.to_string(), "no space left");
    }
}
