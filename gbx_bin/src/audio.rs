use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleRate, SizedSample, StreamConfig};
use gbx_core::Sampler;

/// Keeps the output stream alive.
pub struct Audio {
    _stream: cpal::Stream,
}

/// Opens the default output device. Returns None when no sound can be played.
pub fn start(sampler: Sampler, sample_rate: Option<u32>) -> Option<Audio> {
    let host = cpal::default_host();
    let device = match host.default_output_device() {
        Some(device) => device,
        None => {
            log::warn!("no audio output device, running without sound");
            return None;
        }
    };
    let supported = match device.default_output_config() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("no usable audio config ({}), running without sound", e);
            return None;
        }
    };

    let format = supported.sample_format();
    let mut config: StreamConfig = supported.into();
    if let Some(rate) = sample_rate {
        config.sample_rate = SampleRate(rate);
    }

    let stream = match format {
        cpal::SampleFormat::I16 => build::<i16>(&device, &config, sampler),
        cpal::SampleFormat::U16 => build::<u16>(&device, &config, sampler),
        cpal::SampleFormat::F32 => build::<f32>(&device, &config, sampler),
        format => {
            log::warn!("unsupported sample format {}, running without sound", format);
            return None;
        }
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            log::warn!("failed to open audio stream ({}), running without sound", e);
            return None;
        }
    };
    if let Err(e) = stream.play() {
        log::warn!("failed to start audio stream ({}), running without sound", e);
        return None;
    }

    log::info!(
        "audio: {} channels at {} Hz ({})",
        config.channels,
        config.sample_rate.0,
        format
    );
    Some(Audio { _stream: stream })
}

fn build<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut sampler: Sampler,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let sample_rate = config.sample_rate.0;
    let channels = config.channels as usize;
    let mut buffer = Vec::new();

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            buffer.resize(data.len(), 0.0f32);
            sampler.sample_interleaved(&mut buffer, channels, sample_rate);
            for (out, &s) in data.iter_mut().zip(buffer.iter()) {
                *out = T::from_sample(s);
            }
        },
        |err| log::error!("audio stream error: {}", err),
        None,
    )
}
