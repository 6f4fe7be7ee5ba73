// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

mod dispatcher_tests;
mod registry_tests;
mod tools;
