use std::sync::Arc;
use std::sync::mpsc::channel;

use anyhow::{Result, bail};
use binder::config::Config;
use binder::map::camera::{ChannelCamera, MapEvent};
use binder::map::coordinates::WGS84Coordinate;
use binder::search::LookupStatus;
use binder::search::controller::SuggestionPanel;
use binder::task::TaskForm;
use binder::{LocationSearchController, SearchContext};
use clap::{Parser, Subcommand};
use log::info;

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print the suggestions the search field would offer for a query.
  Search { query: String },
  /// Jump to the best match of a query, like pressing enter in the search field.
  Locate { query: String },
  /// Name a point, like tapping the map.
  Reverse {
    #[arg(allow_negative_numbers = true)]
    lat: f64,
    #[arg(allow_negative_numbers = true)]
    lon: f64,
  },
  /// Select the device location, like the recenter button.
  Recenter,
  /// Fill in and submit the task form.
  AddTask {
    /// Your name.
    #[arg(short, long)]
    name: String,
    /// Title of the task.
    #[arg(short, long)]
    title: String,
    /// Free text describing the task.
    #[arg(short, long, default_value = "")]
    description: String,
    /// Location search; the first suggestion is attached to the task.
    #[arg(short, long)]
    query: Option<String>,
  },
}

fn print_camera(events: &std::sync::mpsc::Receiver<MapEvent>) {
  for MapEvent::FocusOn { region, duration_ms } in events.try_iter() {
    println!("map -> {} ({duration_ms}ms)", region.center);
  }
}

/// Type the query and wait until its suggestions are settled.
async fn suggestions_for(controller: &mut LocationSearchController, query: &str) {
  controller.on_query_changed(query);
  if controller.panel() == SuggestionPanel::Hidden {
    return;
  }
  while let Some(LookupStatus::Stale) = controller.next_lookup().await {}
}

#[tokio::main]
async fn main() -> Result<()> {
  env_logger::init();
  let args = Args::parse();

  let config = Config::new();
  let (camera_sender, camera_events) = channel();
  let context = SearchContext::new(
    Arc::new(config.geocoding_service()),
    Arc::new(ChannelCamera::new(camera_sender)),
    Arc::new(config.location_provider()),
  )
  .with_settings(config.search_settings());
  let mut controller = LocationSearchController::new(context);

  match args.command {
    Command::Search { query } => {
      suggestions_for(&mut controller, &query).await;
      if !controller.is_showing_suggestions() {
        println!("No suggestions for '{query}'");
      }
      for (index, suggestion) in controller.suggestions().iter().enumerate() {
        println!("{}. {suggestion}", index + 1);
      }
    }
    Command::Locate { query } => {
      controller.on_query_changed(query);
      match controller.on_submit().await {
        Ok(selected) => println!(
          "{} ({:.4}, {:.4})",
          selected.address, selected.latitude, selected.longitude
        ),
        Err(e) => bail!("{}", e.notice()),
      }
    }
    Command::Reverse { lat, lon } => {
      let coordinate = WGS84Coordinate::new(lat, lon);
      if !coordinate.is_valid() {
        bail!("{coordinate} is not a valid coordinate");
      }
      let selected = controller.on_map_tapped(coordinate).await;
      println!("{}", selected.address);
    }
    Command::Recenter => match controller.on_recenter_requested().await {
      Ok(selected) => println!(
        "{} ({:.4}, {:.4})",
        selected.address, selected.latitude, selected.longitude
      ),
      Err(e) => bail!("{}", e.notice()),
    },
    Command::AddTask {
      name,
      title,
      description,
      query,
    } => {
      if let Some(query) = query {
        suggestions_for(&mut controller, &query).await;
        let Some(first) = controller.suggestions().first().cloned() else {
          bail!("No location found for '{query}'");
        };
        controller.on_suggestion_picked(first);
      }

      let mut form = TaskForm {
        user_name: name,
        task_title: title,
        description,
        ..TaskForm::default()
      };
      form.set_location(controller.selected_location());

      let store = config.task_store();
      match form.submit(store.as_ref()).await {
        Ok(record) => {
          info!("Inserted {record:?}");
          println!("Task added successfully!");
        }
        Err(e) => bail!("{}", e.notice()),
      }
    }
  }

  print_camera(&camera_events);
  Ok(())
}
