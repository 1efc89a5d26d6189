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

///
/// `not_recoverable_error!` is used where the code can only abort and handing an error back to the caller makes no sense.
/// Control never returns to the caller after the macro runs.
///
#[macro_export]
macro_rules! not_recoverable_error {
    // not_recoverable_error!(on_cond CONDITION, "MSG"): aborts when CONDITION is false.
    ( on_cond $cond:expr, $literal_str:expr ) => {{
        if !($cond) {
            $crate::prelude::error!("not_recoverable_error: {} at {}:{}", $literal_str, file!(), line!());
            panic!("Not recoverable error, panicked with {}", $literal_str);
        }
    }};

    // not_recoverable_error!(with OBJECT, "MSG"): logs OBJECT along with the message.
    ( with $obj_to_log:expr, $literal_str:expr ) => {{
        $crate::prelude::error!("not_recoverable_error: {}. with {:?}", $literal_str, $obj_to_log);
        panic!("Not recoverable error, panicked with {} with {:?}", $literal_str, $obj_to_log);
    }};

    ( $literal_str:expr ) => {{
        $crate::prelude::error!("not_recoverable_error: {}", $literal_str);
        panic!("Not recoverable error, panicked with {}", $literal_str);
    }};
}
