mod controls;
mod details;
mod flows;
mod panels;
