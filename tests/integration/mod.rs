// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod helpers;
pub mod package_repository_test;
pub mod routing_test;
pub mod work_item_repository_test;
pub mod work_queue_test;
