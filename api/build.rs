// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

// Messages double as REST bodies and queue payloads, so every type gets serde
// derives and tolerates missing fields.
const SERDE_ATTR: &str = "#[derive(serde::Serialize, serde::Deserialize)] #[serde(default)]";

fn main() {
    let out_dir = PathBuf::from(
        std::env::var("OUT_DIR")
            .expect("cargo built-in env value 'OUT_DIR' must be set during compilation"),
    );

    println!("cargo:rerun-if-changed=proto");

    tonic_prost_build::configure()
        .file_descriptor_set_path(out_dir.join("carwash_grpc_desc.bin"))
        .type_attribute(".", SERDE_ATTR)
        .compile_protos(
            &["proto/auth/v1/auth.proto", "proto/booking/v1/booking.proto"],
            &["proto"],
        )
        .expect("compile proto");
}
