// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

mod scenario;
