//! # Main Display Module
//!
//! Layout of the single application window: title, status line, the
//! spectrum curve, and the capture / test-wave controls.

use iced::widget::{button, checkbox, column, container, horizontal_space, row, text, text_input, Space};
use iced::{Alignment, Element, Length};

use super::spectrum_curve::SpectrumCurve;
use crate::{AppDisplayData, Message};

/// Height of the spectrum panel in logical pixels.
const SPECTRUM_HEIGHT: f32 = 320.0;

/// Creates the complete main application view
pub fn create_main_view(data: &AppDisplayData) -> Element<'_, Message> {
    let title = text("Spectrum Tuner").size(28);

    let spectrum_panel = container(SpectrumCurve::new(data.series.clone(), data.geometry).view())
        .width(Length::Fill)
        .height(Length::Fixed(SPECTRUM_HEIGHT))
        .padding(10)
        .style(container::bordered_box);

    column![
        title,
        create_status_row(data),
        spectrum_panel,
        create_controls(data),
    ]
    .spacing(15)
    .padding(20)
    .width(Length::Fill)
    .into()
}

fn create_status_row(data: &AppDisplayData) -> Element<'_, Message> {
    let details = match data.sample_rate {
        Some(rate) if data.window_len > 0 => format!(
            "{} Hz | window {} | {} points",
            rate,
            data.window_len,
            data.series.len()
        ),
        _ => "No spectrum yet".to_string(),
    };

    row![text(&data.status), horizontal_space(), text(details)]
        .align_y(Alignment::Center)
        .into()
}

fn create_controls(data: &AppDisplayData) -> Element<'_, Message> {
    let capture_label = if data.capturing { "Stop" } else { "Start" };
    let mut capture_button = button(text(capture_label)).width(Length::Fixed(90.0));
    let mut test_button = button(text("Test FFT"));
    if data.worker_active {
        capture_button = capture_button.on_press(Message::ToggleCapture);
        test_button = test_button.on_press(Message::TestFft);
    }

    row![
        capture_button,
        Space::with_width(30),
        text("Frequency (Hz)"),
        text_input("440", &data.frequency_input)
            .on_input(Message::FrequencyChanged)
            .on_submit(Message::TestFft)
            .width(Length::Fixed(100.0)),
        text("Samples"),
        text_input("4096", &data.samples_input)
            .on_input(Message::SamplesChanged)
            .on_submit(Message::TestFft)
            .width(Length::Fixed(100.0)),
        checkbox("Square wave", data.square_wave).on_toggle(Message::SquareWaveToggled),
        test_button,
    ]
    .spacing(10)
    .align_y(Alignment::Center)
    .into()
}
